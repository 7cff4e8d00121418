use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = dirtree::cli::parse();
    app::run(args)
}
