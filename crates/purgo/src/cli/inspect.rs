//! The `purgo inspect` command.

use std::path::PathBuf;

use clap::Args;
use console::Style;
use purgo_core::MetadataInventory;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// File to inspect
    pub file: PathBuf,

    /// Print the inventory as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Execute the inspect command.
pub async fn execute(args: InspectArgs) -> anyhow::Result<()> {
    let data = tokio::fs::read(&args.file).await?;
    let inventory = purgo_core::inspect(&data)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
    } else {
        print!("{}", render(&args.file, &inventory));
    }
    Ok(())
}

fn render(path: &std::path::Path, inventory: &MetadataInventory) -> String {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    let red = Style::new().red();

    let mut out = format!("{}\n", bold.apply_to(path.display()));
    let Some(format) = inventory.format else {
        out.push_str("  not a supported image; nothing to strip\n");
        return out;
    };
    out.push_str(&format!("  format: {format}\n"));

    if inventory.blocks.is_empty() {
        out.push_str("  no metadata found\n");
        return out;
    }
    for block in &inventory.blocks {
        out.push_str(&format!(
            "  {:<12} {}\n",
            block.kind.to_string(),
            dim.apply_to(format!("{} bytes", block.len))
        ));
    }

    if let Some(exif) = &inventory.exif {
        let fields = [
            ("camera make", &exif.camera_make),
            ("camera model", &exif.camera_model),
            ("captured at", &exif.captured_at),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                out.push_str(&format!("    {label}: {value}\n"));
            }
        }
        if exif.has_gps {
            out.push_str(&format!("    {}\n", red.apply_to("GPS location present")));
        }
        out.push_str(&format!("    {} EXIF fields\n", exif.field_count));
    }
    out
}
