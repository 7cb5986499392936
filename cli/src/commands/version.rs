//! Version command

use crate::infra::library::Library;

/// Run the version command. Library absence is not an error here — the
/// version of the CLI alone is still useful.
pub fn run(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    let library = Library::locate(None).ok().and_then(|lib| lib.version());

    if json {
        let lib_field = library
            .as_deref()
            .map_or_else(|| "null".to_string(), |v| format!(r#""{v}""#));
        println!(r#"{{"version":"{version}","library":{lib_field}}}"#);
    } else {
        println!("quarry {version}");
        if let Some(lib) = library {
            println!("library {lib}");
        }
    }
}
