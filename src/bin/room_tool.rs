use anyhow::{anyhow, Context, Result};
use bowerbird::catalog::{KindBuilder, ObjectCatalog};
use bowerbird::codec;
use bowerbird::prefs::MemoryPreferences;
use bowerbird::render_host::NullRenderHost;
use bowerbird::session::Session;
use futures::executor::block_on;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };
    match command.as_str() {
        "validate" => {
            let room_path = args
                .next()
                .ok_or_else(|| anyhow!("validate requires a path: room_tool validate <room>"))?;
            cmd_validate(&room_path)
        }
        "list" => {
            let room_path =
                args.next().ok_or_else(|| anyhow!("list requires a path: room_tool list <room>"))?;
            cmd_list(&room_path)
        }
        "normalize" => {
            let input = args.next().ok_or_else(|| {
                anyhow!("normalize requires paths: room_tool normalize <in> <out>")
            })?;
            let output = args.next().ok_or_else(|| {
                anyhow!("normalize requires paths: room_tool normalize <in> <out>")
            })?;
            cmd_normalize(&input, &output)
        }
        "generate" => {
            let output = args.next().ok_or_else(|| {
                anyhow!("generate requires a path: room_tool generate <output> [--count N] [--seed S]")
            })?;
            let mut count = 1000usize;
            let mut seed = None;
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--count" => {
                        count = args
                            .next()
                            .ok_or_else(|| anyhow!("--count needs a value"))?
                            .parse()
                            .context("parsing --count")?;
                    }
                    "--seed" => {
                        seed = Some(
                            args.next()
                                .ok_or_else(|| anyhow!("--seed needs a value"))?
                                .parse()
                                .context("parsing --seed")?,
                        );
                    }
                    other => return Err(anyhow!("unknown flag '{other}' for generate")),
                }
            }
            cmd_generate(&output, count, seed)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(anyhow!("unknown command '{other}'")),
    }
}

fn print_usage() {
    eprintln!(
        "Room Tool

Usage:
  room_tool validate <room.json>        Check that every record parses and builds
  room_tool list <room.json>            List records with kind and position
  room_tool normalize <input> <output>  Re-export a room in canonical form
  room_tool generate <output> [--count N] [--seed S]
                                        Generate a populated classroom file
  room_tool help                        Show this message
"
    );
}

fn cmd_validate(room_path: &str) -> Result<()> {
    let raw = read_room(room_path)?;
    let catalog = ObjectCatalog::with_builtin_kinds();
    let import = codec::deserialize_room(&catalog, &raw)?;

    let mut issues: Vec<String> = import
        .skipped
        .iter()
        .map(|skip| format!("entity {}: {}", skip.index, skip.error))
        .collect();

    let mut built = import.ready.len();
    for seed in &import.pending {
        let descriptor = catalog.resolve(&seed.kind_id)?;
        let KindBuilder::Composite(builder) = &descriptor.builder else {
            continue;
        };
        match block_on(builder.build(seed.original.clone())) {
            Ok(_) => built += 1,
            Err(err) => issues.push(format!("builder for '{}' failed: {err:#}", seed.kind_id)),
        }
    }

    if issues.is_empty() {
        println!("Room '{room_path}' is valid. Entities: {built}.");
        Ok(())
    } else {
        Err(anyhow!(format!("room '{}' has issues:\n  - {}", room_path, issues.join("\n  - "))))
    }
}

fn cmd_list(room_path: &str) -> Result<()> {
    let raw = read_room(room_path)?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing room '{room_path}'"))?;
    let records =
        document.as_array().ok_or_else(|| anyhow!("room document is not an array"))?;

    println!("{:<5} {:<12} {:<26} {}", "Idx", "Kind", "Position", "Details");
    println!("{}", "-".repeat(64));
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let kind = record.get("type").and_then(Value::as_str).unwrap_or("-");
        *counts.entry(kind).or_default() += 1;
        let position = match record.get("position") {
            Some(p) => format!(
                "({:.2}, {:.2}, {:.2})",
                p.get("x").and_then(Value::as_f64).unwrap_or(0.0),
                p.get("y").and_then(Value::as_f64).unwrap_or(0.0),
                p.get("z").and_then(Value::as_f64).unwrap_or(0.0),
            ),
            None => "(origin)".to_string(),
        };
        println!("{index:<5} {kind:<12} {position:<26} {}", record_details(record));
    }
    let summary: Vec<String> =
        counts.iter().map(|(kind, count)| format!("{kind} x{count}")).collect();
    println!("Total: {} ({})", records.len(), summary.join(", "));
    Ok(())
}

fn record_details(record: &Value) -> String {
    if let Some(size) = record.pointer("/properties/size").and_then(Value::as_f64) {
        return format!("size {size}");
    }
    if let Some(radius) = record.get("radius").and_then(Value::as_f64) {
        return format!("radius {radius}");
    }
    match (
        record.get("width").and_then(Value::as_f64),
        record.get("height").and_then(Value::as_f64),
        record.get("depth").and_then(Value::as_f64),
    ) {
        (Some(w), Some(h), Some(d)) => format!("{w} x {h} x {d}"),
        _ => "-".to_string(),
    }
}

fn cmd_normalize(input: &str, output: &str) -> Result<()> {
    let raw = read_room(input)?;
    let mut session = Session::new(
        ObjectCatalog::with_builtin_kinds(),
        Box::new(MemoryPreferences::default()),
        Box::new(NullRenderHost),
    );
    let summary = session.import_document(&raw)?;
    session.settle();
    let text = session.export_document()?;
    fs::write(output, &text).with_context(|| format!("writing '{output}'"))?;
    println!(
        "Normalized '{}' -> '{}' ({} entities, {} skipped)",
        input,
        output,
        session.store().len(),
        summary.skipped
    );
    Ok(())
}

fn cmd_generate(output: &str, count: usize, seed: Option<u64>) -> Result<()> {
    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut records = base_room();
    let templates = furniture_templates();
    for _ in 0..count {
        let mut record = templates[rng.gen_range(0..templates.len())].clone();
        if let Some(position) = record.get_mut("position") {
            offset_axis(position, "x", rng.gen_range(-10.0..10.0));
            offset_axis(position, "z", rng.gen_range(-10.0..10.0));
        }
        records.push(record);
    }

    let total = records.len();
    let text = serde_json::to_string_pretty(&Value::Array(records))
        .context("serializing generated room")?;
    fs::write(output, text).with_context(|| format!("writing '{output}'"))?;
    println!("Generated '{output}' with {total} objects");
    Ok(())
}

fn offset_axis(position: &mut Value, axis: &str, offset: f64) {
    if let Some(value) = position.get_mut(axis) {
        let base = value.as_f64().unwrap_or(0.0);
        *value = Value::from(base + offset);
    }
}

/// Floor, four walls, and the whiteboard every generated classroom starts
/// with. Box records keep the legacy scalar rotation form on purpose; the
/// importer must accept both.
fn base_room() -> Vec<Value> {
    vec![
        json!({
            "type": "box", "width": 30, "height": 0.2, "depth": 20, "color": 13421772,
            "position": { "x": 0, "y": 0, "z": 0 }, "rotation": 0
        }),
        json!({
            "type": "box", "width": 30, "height": 3, "depth": 0.2, "color": 4473924,
            "position": { "x": 0, "y": 1.5, "z": -10 }, "rotation": 0
        }),
        json!({
            "type": "box", "width": 30, "height": 3, "depth": 0.2, "color": 4473924,
            "position": { "x": 0, "y": 1.5, "z": 10 }, "rotation": 0
        }),
        json!({
            "type": "box", "width": 0.2, "height": 3, "depth": 20, "color": 4473924,
            "position": { "x": -15, "y": 1.5, "z": 0 }, "rotation": 0
        }),
        json!({
            "type": "box", "width": 0.2, "height": 3, "depth": 20, "color": 4473924,
            "position": { "x": 15, "y": 1.5, "z": 0 }, "rotation": 0
        }),
        json!({
            "type": "whiteboard", "rotation": 0, "selected": false,
            "properties": { "size": 1 },
            "position": {
                "x": -0.06710898809089949,
                "y": 1.6846811489857818,
                "z": 9.86241474523793
            }
        }),
    ]
}

/// Table/chair pairs across the room, jittered per generated copy.
fn furniture_templates() -> Vec<Value> {
    let mut templates = Vec::new();
    for x in [-5.0, -2.5, 0.0, 2.5, 5.0] {
        templates.push(json!({
            "type": "table2", "rotation": 0, "selected": false,
            "properties": { "size": 1 },
            "position": { "x": x, "y": 0.5, "z": -3.0 }
        }));
        templates.push(json!({
            "type": "chair", "rotation": 0, "selected": false,
            "properties": { "size": 1 },
            "position": { "x": x, "y": 0.5, "z": -3.8 }
        }));
    }
    templates
}

fn read_room(path: &str) -> Result<String> {
    let normalized =
        Path::new(path).canonicalize().unwrap_or_else(|_| Path::new(path).to_path_buf());
    fs::read_to_string(&normalized)
        .with_context(|| format!("reading room '{}'", normalized.display()))
}
