pub mod fixtures;

pub use fixtures::{
    abc_rows, ids, name_schema, people_rows, people_schema, rows_from_json, sized_grid,
};
