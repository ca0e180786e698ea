mod command;
mod guide;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
