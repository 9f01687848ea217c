use anyhow::Result;

fn main() -> Result<()> {
    simtree_cli::main_entry()
}
