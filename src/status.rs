use std::{
    io,
    process::{ExitStatus, Output},
};

pub trait StatusExt {
    fn as_result(self) -> io::Result<()>;
}

impl StatusExt for ExitStatus {
    fn as_result(self) -> io::Result<()> {
        if self.success() {
            Ok(())
        } else if let Some(127) = self.code() {
            Err(io::Error::new(io::ErrorKind::NotFound, "command was not found"))
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("command failed with exit status: {}", self),
            ))
        }
    }
}

/// Merges the captured stdout and stderr of a finished command.
pub fn captured(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim_end().to_owned()
}
