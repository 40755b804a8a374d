use clap::{ArgAction, Parser};
use jp2box::{
    EncodeOptions, MetadataNode, boxes_from_tree, encode_boxes_with, from_tree,
    metadata::ROOT_NODE_NAME,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Write JP2/JPX boxes from a JSON metadata tree")]
struct Args {
    /// JSON metadata tree, as printed by `jp2dump --json`
    input: PathBuf,

    /// Where to write the encoded boxes
    #[arg(short, long)]
    output: PathBuf,

    /// Refuse boxes that need a 64-bit extended length
    #[arg(long, action = ArgAction::SetTrue)]
    no_extended_length: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.input)?;
    let root: MetadataNode = serde_json::from_str(&text)?;
    let boxes = if root.name == ROOT_NODE_NAME {
        boxes_from_tree(&root)?
    } else {
        vec![from_tree(&root)?]
    };

    let options = EncodeOptions::new().with_extended_length(!args.no_extended_length);
    let bytes = encode_boxes_with(&boxes, &options)?;
    std::fs::write(&args.output, &bytes)?;
    info!(
        "wrote {} top-level boxes ({} bytes) to {}",
        boxes.len(),
        bytes.len(),
        args.output.display()
    );
    Ok(())
}
