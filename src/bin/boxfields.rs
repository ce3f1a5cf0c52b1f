use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use mp4fields::{
    boxes::FourCC,
    instance::BoxInstance,
    json_api::JsonBox,
    known_layouts::KnownLayout,
    registry::default_registry,
};
use std::fs;
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Decode and encode the field payload of MP4/ISOBMFF boxes")]
struct Args {
    /// Box type (e.g. av1C, vpcC, pasp, btrt, ftyp)
    typ: Option<String>,

    /// Payload as a hex string (box header already stripped)
    #[arg(long, conflicts_with = "file")]
    hex: Option<String>,

    /// Read the payload from a file
    #[arg(long)]
    file: Option<String>,

    /// Byte offset of the payload within --file
    #[arg(long, default_value_t = 0, requires = "file")]
    offset: u64,

    /// Payload length within --file (0 means up to end of file)
    #[arg(long, default_value_t = 0, requires = "file")]
    len: u64,

    /// Start from the layout defaults instead of decoding a payload
    #[arg(long, action = ArgAction::SetTrue)]
    defaults: bool,

    /// Assign a field before printing, NAME=VALUE (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// List the registered box types and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,

    /// Emit JSON instead of a field table
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "mp4fields=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_payload(args: &Args) -> anyhow::Result<Vec<u8>> {
    if let Some(h) = &args.hex {
        let h: String = h.split_whitespace().collect();
        return hex::decode(h.trim_start_matches("0x")).context("--hex is not valid hex");
    }
    if let Some(path) = &args.file {
        let data = fs::read(path).with_context(|| format!("reading {}", path))?;
        let start = usize::try_from(args.offset)?;
        if start > data.len() {
            bail!("offset {} is past end of file ({} bytes)", start, data.len());
        }
        let end = if args.len == 0 {
            data.len()
        } else {
            start
                .checked_add(usize::try_from(args.len)?)
                .filter(|&e| e <= data.len())
                .with_context(|| format!("range {}+{} is past end of file", start, args.len))?
        };
        return Ok(data[start..end].to_vec());
    }
    bail!("one of --hex, --file or --defaults is required")
}

fn print_table(inst: &BoxInstance) {
    let name = KnownLayout::try_from(inst.typ())
        .map(|k| k.full_name())
        .unwrap_or("");
    println!("{} {} ({} bytes)", inst.typ(), name, inst.encoded_len());
    let pad = inst.fields().map(|(s, _)| s.name().len()).max().unwrap_or(0);
    for (spec, value) in inst.fields() {
        let shape = match spec.width() {
            Some(w) => format!("u{}", w),
            None => "bytes".to_string(),
        };
        println!("  {:<pad$}  {:>5}  {}", spec.name(), shape, value, pad = pad);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let reg = default_registry()?;

    if args.list {
        for typ in reg.types() {
            let name = KnownLayout::try_from(typ)
                .map(|k| k.full_name())
                .unwrap_or("");
            println!("{}  {}", typ, name);
        }
        return Ok(());
    }

    let Some(typ_arg) = args.typ.as_deref() else {
        bail!("a box type is required (see --list)");
    };
    let typ = FourCC::parse(typ_arg)
        .with_context(|| format!("`{}` is not a four-character code", typ_arg))?;

    let mut inst = if args.defaults {
        reg.instantiate(typ)
            .with_context(|| format!("no layout registered for `{}`", typ))?
    } else {
        let payload = read_payload(&args)?;
        let (inst, consumed) = reg
            .decode(typ, &payload)
            .with_context(|| format!("no layout registered for `{}`", typ))?
            .with_context(|| format!("decoding `{}` payload", typ))?;
        if consumed < payload.len() {
            tracing::warn!(
                consumed,
                available = payload.len(),
                "payload has trailing bytes after the last field"
            );
        }
        inst
    };

    for assignment in &args.set {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("--set expects NAME=VALUE, got `{}`", assignment))?;
        inst.set_from_str(name, value)
            .with_context(|| format!("setting `{}`", name))?;
    }

    let encoded = inst.to_bytes()?;

    if args.json {
        let out = serde_json::json!({
            "box": JsonBox::from_instance(&inst),
            "encoded": hex::encode(&encoded),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_table(&inst);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "encoded: {}", hex::encode(&encoded))?;
    }

    Ok(())
}
