use miette::Result;

pub fn run() -> Result<()> {
    println!("sprig {}", sprig_core::VERSION);
    Ok(())
}
