use clap::{ArgAction, Parser};
use jp2box::{
    BoxHeader, BoxReader, FourCC, Jp2Box, ParseOptions, boxes_to_tree, default_registry,
    read_box_header, util::hex_dump,
};
use std::io::Cursor;

#[derive(Parser, Debug)]
#[command(version, about = "JP2/JPX box explorer")]
struct Args {
    /// JP2/JPX file path
    path: String,

    /// Limit container nesting accepted by the parser
    #[arg(long, default_value_t = jp2box::options::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Fail on box types the registry does not know
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Dump raw payload of every box with this 4CC (e.g. --raw "xml ")
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Show bytes count when dumping raw (0 means entire box payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit the metadata tree as JSON instead of human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let data = std::fs::read(&args.path)?;

    let options = ParseOptions::new()
        .with_max_depth(args.max_depth)
        .with_strict(args.strict);
    let mut reader = BoxReader::with_options(&data, default_registry(), options);

    // Keep whatever parsed before a failure; report it once output is done.
    let mut top = Vec::new();
    let mut failure = None;
    while let Some(res) = reader.next_entry() {
        match res {
            Ok(entry) => top.push(entry),
            Err(e) => failure = Some(e),
        }
    }

    if args.json {
        let boxes: Vec<Jp2Box> = top.into_iter().map(|(_, b)| b).collect();
        println!("{}", serde_json::to_string_pretty(&boxes_to_tree(&boxes))?);
    } else {
        for (hdr, b) in &top {
            print_box(&data, 0, hdr, b, 0)?;
        }
        if let Some(sel) = args.raw.as_ref() {
            let typ = FourCC::from_str(sel)
                .ok_or_else(|| anyhow::anyhow!("--raw expects a 4-character box type"))?;
            for (hdr, b) in &top {
                dump_raw(&data, 0, hdr, b, typ, args.bytes)?;
            }
        }
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

// ---------- Walking stored headers ----------

/// Payload of the box `hdr` describes, `hdr.start` being relative to `data`.
fn stored_payload<'a>(data: &'a [u8], hdr: &BoxHeader) -> anyhow::Result<&'a [u8]> {
    let end = if hdr.size == 0 { data.len() as u64 } else { hdr.start + hdr.size };
    data.get((hdr.start + hdr.header_size) as usize..end as usize)
        .ok_or_else(|| anyhow::anyhow!("`{}` box at {:#x} overruns its parent", hdr.typ, hdr.start))
}

/// Headers of a container's children as stored, paired with the parsed
/// children. Offsets are relative to `payload`.
fn stored_children<'a>(
    payload: &[u8],
    children: &'a [Jp2Box],
) -> anyhow::Result<Vec<(BoxHeader, &'a Jp2Box)>> {
    let mut cur = Cursor::new(payload);
    let mut out = Vec::with_capacity(children.len());
    for c in children {
        let h = read_box_header(&mut cur)?;
        cur.set_position(h.start + h.size);
        out.push((h, c));
    }
    Ok(out)
}

// ---------- Human-readable tree ----------

fn print_box(
    data: &[u8],
    base: u64,
    hdr: &BoxHeader,
    b: &Jp2Box,
    depth: usize,
) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    let payload = stored_payload(data, hdr)?;
    let node = default_registry().box_to_node(b);
    let kind = if b.is_container() { " (container)" } else { "" };
    println!(
        "{indent}{:>8} {:>10} {} {}{kind}",
        format!("{:#x}", base + hdr.start),
        hdr.header_size + payload.len() as u64,
        b.type_tag(),
        node.name
    );
    if !b.is_container() {
        for (k, v) in &node.attributes {
            println!("{indent}           {k}={}", shorten(v));
        }
    }

    let child_base = base + hdr.start + hdr.header_size;
    for (h, c) in stored_children(payload, b.children())? {
        print_box(payload, child_base, &h, c, depth + 1)?;
    }
    Ok(())
}

fn shorten(v: &str) -> String {
    const MAX: usize = 64;
    match v.char_indices().nth(MAX) {
        Some((i, _)) => format!("{}... ({} chars)", &v[..i], v.chars().count()),
        None => v.to_string(),
    }
}

// ---------- Raw dump ----------

fn dump_raw(
    data: &[u8],
    base: u64,
    hdr: &BoxHeader,
    b: &Jp2Box,
    sel: FourCC,
    limit: usize,
) -> anyhow::Result<()> {
    let payload = stored_payload(data, hdr)?;
    let off = base + hdr.start + hdr.header_size;
    if b.type_tag() == sel {
        let len = if limit == 0 { payload.len() } else { limit.min(payload.len()) };
        println!("\n== {} payload: offset={:#x}, len={} ==", sel, off, len);
        print!("{}", hex_dump(&payload[..len], off));
    }
    for (h, c) in stored_children(payload, b.children())? {
        dump_raw(payload, off, &h, c, sel, limit)?;
    }
    Ok(())
}
