use std::io::{Read, Write};

use anyhow::Context;

use duobundle_cart_transform::{Input, run};

/// Reads a cart snapshot from stdin and writes the expansion result to stdout.
fn main() -> anyhow::Result<()> {
    duobundle_observability::init();

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read cart input from stdin")?;

    let input: Input = serde_json::from_str(&raw).context("cart input is not a valid snapshot")?;
    let result = run(&input);

    tracing::debug!(
        lines = input.cart.lines.len(),
        operations = result.operations.len(),
        "cart transform complete"
    );

    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, result.as_ref()).context("failed to write result")?;
    out.write_all(b"\n")?;
    Ok(())
}
