use clap::Parser;

use glint::config::Options;

fn main() -> anyhow::Result<()> {
    glint::run(Options::parse())
}
