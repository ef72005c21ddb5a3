// ABOUTME: Native functions bound into the global environment at startup

use crate::env::Environment;
use crate::value::{NativeFunction, Value};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Registers the native function library into `globals`. Called once per
/// `Interpreter`.
pub fn register(globals: &Rc<Environment>) {
    define_native(globals, "clock", 0, lox_clock);
    define_native(globals, "readfile", 1, lox_readfile);
    define_native(globals, "writefile", 2, lox_writefile);
}

fn define_native(
    globals: &Rc<Environment>,
    name: &'static str,
    arity: usize,
    func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
) {
    globals.define(
        name.to_string(),
        Value::Native(Rc::new(NativeFunction {
            name,
            arity,
            func: Rc::new(func),
        })),
    );
}

fn lox_clock(_args: &[Value]) -> Result<Value, String> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| "System clock is before the Unix epoch.".to_string())?
        .as_secs_f64();
    Ok(Value::Number(seconds))
}

/// Reads a file's contents as a string. Returns `nil` on any I/O error,
/// matching the permissive behavior of the original single-process
/// interpreter rather than raising a runtime error.
fn lox_readfile(args: &[Value]) -> Result<Value, String> {
    let path = match &args[0] {
        Value::String(path) => path,
        other => return Err(format!("readfile expects a string path, got {}.", other.type_name())),
    };
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Value::String(content)),
        Err(_) => Ok(Value::Nil),
    }
}

/// Writes `contents` to `path`, returning `true` on success and `false` on
/// any I/O error.
fn lox_writefile(args: &[Value]) -> Result<Value, String> {
    let path = match &args[0] {
        Value::String(path) => path,
        other => return Err(format!("writefile expects a string path, got {}.", other.type_name())),
    };
    let contents = match &args[1] {
        Value::String(contents) => contents,
        other => {
            return Err(format!(
                "writefile expects string contents, got {}.",
                other.type_name()
            ))
        }
    };
    Ok(Value::Bool(std::fs::write(path, contents).is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_returns_a_number() {
        let result = lox_clock(&[]).unwrap();
        assert!(matches!(result, Value::Number(n) if n > 0.0));
    }

    #[test]
    fn readfile_of_missing_path_is_nil_not_an_error() {
        let result = lox_readfile(&[Value::String("/nonexistent/path/does-not-exist".to_string())]);
        assert!(matches!(result, Ok(Value::Nil)));
    }

    #[test]
    fn writefile_then_readfile_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");
        let path_str = path.to_str().unwrap().to_string();

        let wrote = lox_writefile(&[
            Value::String(path_str.clone()),
            Value::String("hello".to_string()),
        ])
        .unwrap();
        assert!(matches!(wrote, Value::Bool(true)));

        let read = lox_readfile(&[Value::String(path_str)]).unwrap();
        assert!(matches!(read, Value::String(s) if s == "hello"));
    }

    #[test]
    fn register_binds_all_three_names() {
        let globals = Environment::new();
        register(&globals);
        assert!(globals.get("clock").is_some());
        assert!(globals.get("readfile").is_some());
        assert!(globals.get("writefile").is_some());
    }
}
