//! dw - Draftwork command-line entry point

fn main() -> anyhow::Result<()> {
    draftwork::cli::run()
}
