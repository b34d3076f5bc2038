use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "sessiongate", about = "Refresh-session issuing and rotation service")]
pub struct Cli {
    /// Path to a TOML settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
