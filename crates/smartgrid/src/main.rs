mod preview;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use smartgrid_core::{
    ColumnDefinition, Density, FilterPredicate, FilterSpec, GridConfig, GridConfigStore,
    GridError, GridInput, QuerySpec, Schema, SmartGrid, SortSpec,
};
use smartgrid_export::{ExportFormat, ImportOptions, RowIdSource, import_delimited, infer_schema};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();

    let config = load_config(args.config.as_ref())
        .unwrap_or_else(|e| fatal(&format!("Failed to load config: {e}")));

    let content = fs::read(&args.input).unwrap_or_else(|e| {
        fatal(&format!("Failed to read '{}': {e}", args.input.display()))
    });

    let delimiter = if args.tsv { b'\t' } else { b',' };

    let schema = match &args.schema {
        Some(path) => load_schema(path)
            .unwrap_or_else(|e| fatal(&format!("Failed to load schema: {e}"))),
        None => {
            let skip: Vec<&str> = args.id_header.iter().map(String::as_str).collect();
            infer_schema(content.as_slice(), delimiter, &skip)
                .unwrap_or_else(|e| fatal(&format!("Failed to read headers: {e}")))
        }
    };

    let options = ImportOptions {
        delimiter,
        id_source: match &args.id_header {
            Some(header) => RowIdSource::Header(header.clone()),
            None => RowIdSource::LineNumber,
        },
    };

    let rows = import_delimited(content.as_slice(), &schema, &options)
        .unwrap_or_else(|e| fatal(&format!("Failed to import: {e}")));

    log::info!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        schema.len(),
        args.input.display()
    );

    let query = build_query(&args, &schema).unwrap_or_else(|e| fatal(&e.to_string()));

    let mut grid = SmartGrid::new(schema, config);
    grid.handle(GridInput::Resize {
        width: args.width,
        height: args.height,
    });
    if let Some(density) = args.density {
        grid.handle(GridInput::SetDensity(density));
    }
    grid.set_rows(rows);
    grid.set_query(query);

    if args.scroll > 0.0 {
        grid.handle(GridInput::Scroll(args.scroll));
        grid.handle(GridInput::Frame);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = match args.export {
        Some(format) => smartgrid_export::export(
            grid.rows(),
            grid.schema(),
            grid.view(),
            format,
            &mut out,
        )
        .map_err(|e| e.to_string()),
        None => out
            .write_all(preview::render_text(&grid.scene()).as_bytes())
            .map_err(|e| e.to_string()),
    };

    if let Err(e) = result {
        fatal(&format!("Failed to write output: {e}"));
    }
}

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    schema: Option<PathBuf>,
    id_header: Option<String>,
    tsv: bool,
    sort: Option<String>,
    filters: Vec<String>,
    group: Option<String>,
    search: Option<String>,
    scroll: f32,
    width: f32,
    height: f32,
    density: Option<Density>,
    export: Option<ExportFormat>,
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut input = None;
    let mut parsed = Args {
        input: PathBuf::new(),
        config: None,
        schema: None,
        id_header: None,
        tsv: false,
        sort: None,
        filters: Vec::new(),
        group: None,
        search: None,
        scroll: 0.0,
        width: 1000.0,
        height: 600.0,
        density: None,
        export: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = args.next().map(PathBuf::from),
            "--schema" => parsed.schema = args.next().map(PathBuf::from),
            "--id" => parsed.id_header = args.next(),
            "--tsv" => parsed.tsv = true,
            "--sort" => parsed.sort = args.next(),
            "--filter" => parsed.filters.extend(args.next()),
            "--group" => parsed.group = args.next(),
            "--search" => parsed.search = args.next(),
            "--scroll" => parsed.scroll = number_arg("--scroll", args.next()),
            "--width" => parsed.width = number_arg("--width", args.next()),
            "--height" => parsed.height = number_arg("--height", args.next()),
            "--density" => {
                let name = args.next().unwrap_or_default();
                parsed.density = Some(
                    Density::parse(&name)
                        .unwrap_or_else(|| fatal(&format!("Unknown density '{name}'"))),
                );
            }
            "--export" => {
                let name = args.next().unwrap_or_default();
                parsed.export = Some(
                    ExportFormat::parse(&name)
                        .unwrap_or_else(|| fatal(&format!("Unknown export format '{name}'"))),
                );
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other if other.starts_with("--") => fatal(&format!("Unknown argument: {other}")),
            other => input = Some(PathBuf::from(other)),
        }
    }

    parsed.input = input.unwrap_or_else(|| fatal("An input file is required"));
    parsed
}

fn print_usage() {
    eprintln!("Usage: smartgrid <file> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>        Grid config JSON (default: <config_dir>/smartgrid/grid.json)");
    eprintln!("  --schema <path>        Column definitions as a JSON array (default: inferred)");
    eprintln!("  --id <header>          Header holding row identities (default: line number)");
    eprintln!("  --tsv                  Input is tab separated");
    eprintln!("  --sort <col|-col>      Sort ascending, or descending with a leading '-'");
    eprintln!("  --filter <col:op:val>  Filter; op is contains, not-contains, eq, ne, starts-with,");
    eprintln!("                         ends-with, gt, lt, empty, not-empty. Repeatable");
    eprintln!("  --group <col,...>      Group by columns, outermost first");
    eprintln!("  --search <text>        Search across all columns");
    eprintln!("  --scroll <px>          Scroll offset of the body");
    eprintln!("  --width <px>           Viewport width (default 1000)");
    eprintln!("  --height <px>          Viewport height (default 600)");
    eprintln!("  --density <name>       compact, normal, tall or extra");
    eprintln!("  --export <format>      Write the view as csv, tsv, json or json-compact instead");
}

fn number_arg(flag: &str, value: Option<String>) -> f32 {
    value
        .as_deref()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or_else(|| fatal(&format!("{flag} expects a non-negative number")))
}

fn load_config(path: Option<&PathBuf>) -> Result<GridConfig, GridError> {
    let store = match path {
        Some(path) => GridConfigStore::at(path),
        None => GridConfigStore::new()?,
    };
    store.load()
}

fn load_schema(path: &PathBuf) -> Result<Schema, GridError> {
    let content = fs::read_to_string(path)?;
    let columns: Vec<ColumnDefinition> = serde_json::from_str(&content)
        .map_err(|e| GridError::InvalidConfig(format!("{}: {e}", path.display())))?;
    Ok(Schema::new(columns))
}

fn build_query(args: &Args, schema: &Schema) -> Result<QuerySpec, GridError> {
    let known = |column_id: &str| -> Result<String, GridError> {
        schema
            .find_by_header(column_id)
            .map(|c| c.id.clone())
            .ok_or_else(|| GridError::UnknownColumn(column_id.to_string()))
    };

    let sort = match args.sort.as_deref() {
        Some(spec) => Some(match spec.strip_prefix('-') {
            Some(column) => SortSpec::desc(known(column)?),
            None => SortSpec::asc(known(spec)?),
        }),
        None => None,
    };

    let filters = args
        .filters
        .iter()
        .map(|raw| parse_filter(raw, &known))
        .collect::<Result<Vec<_>, _>>()?;

    let grouping = match args.group.as_deref() {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(known)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(QuerySpec {
        sort,
        filters,
        grouping,
        global_search: args.search.clone().unwrap_or_default(),
    })
}

fn parse_filter(
    raw: &str,
    known: &dyn Fn(&str) -> Result<String, GridError>,
) -> Result<FilterSpec, GridError> {
    let mut parts = raw.splitn(3, ':');
    let column = parts.next().unwrap_or_default();
    let op = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default();

    let predicate = match op {
        "contains" => FilterPredicate::Contains,
        "not-contains" => FilterPredicate::NotContains,
        "eq" => FilterPredicate::Equals,
        "ne" => FilterPredicate::NotEquals,
        "starts-with" => FilterPredicate::StartsWith,
        "ends-with" => FilterPredicate::EndsWith,
        "gt" => FilterPredicate::GreaterThan,
        "lt" => FilterPredicate::LessThan,
        "empty" => FilterPredicate::IsEmpty,
        "not-empty" => FilterPredicate::IsNotEmpty,
        other => {
            return Err(GridError::InvalidConfig(format!(
                "Unknown filter operator '{other}' in '{raw}'"
            )));
        }
    };

    Ok(FilterSpec::new(known(column)?, predicate, value))
}

fn fatal(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1)
}
