//! Interactive confirmation before destroying the destination

use std::io::{self, BufRead, Write};

/// Exact input that confirms the flush
pub const CONFIRMATION_TOKEN: &str = "YES";

/// Warn that every key on `destination` will be deleted and ask for
/// [`CONFIRMATION_TOKEN`]. Any other answer, including end of input, refuses.
pub fn confirm_destructive<R, W>(mut input: R, mut output: W, destination: &str) -> io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    writeln!(
        output,
        "WARNING: this will delete ALL keys from dest: {}",
        destination
    )?;
    write!(output, "Type {} to continue: ", CONFIRMATION_TOKEN)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == CONFIRMATION_TOKEN)
}
