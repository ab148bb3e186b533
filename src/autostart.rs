//! XDG autostart `.desktop` entry management.

use crate::config::{autostart_desktop_file, APP_NAME};
use std::io;

/// Write the autostart `.desktop` entry pointing at the current executable.
pub fn enable() -> io::Result<()> {
    let exe = std::env::current_exe()?;
    let desktop_path = autostart_desktop_file();
    if let Some(parent) = desktop_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "[Desktop Entry]\nType=Application\nName={name}\nExec={exe}\nX-GNOME-Autostart-enabled=true\nTerminal=false\n",
        name = APP_NAME,
        exe = exe.display(),
    );
    std::fs::write(desktop_path, contents)
}

pub fn disable() -> io::Result<()> {
    match std::fs::remove_file(autostart_desktop_file()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

pub fn is_enabled() -> bool {
    autostart_desktop_file().exists()
}
