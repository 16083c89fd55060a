use std::{env, iter::Peekable, path::PathBuf, str::Chars};

use crate::error::PathError;

/// Resolves a configured path string.
///
/// Expands `$VAR` and `${VAR}`, turns a leading `~` into the home directory,
/// and makes relative paths absolute against the current directory.
/// `$DEPOT_ROOT` falls back to [`default_root`] when unset.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is empty
/// * [`PathError::CurrentDir`] if the current directory cannot be determined
/// * [`PathError::MissingEnvVar`] if a referenced variable is undefined
/// * [`PathError::UnclosedVariable`] for `${VAR` without the closing brace
pub fn resolve_path(path: &str) -> Result<PathBuf, PathError> {
    let path = path.trim();

    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let path_buf = PathBuf::from(expand_variables(path)?);

    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path_buf))
            .map_err(|err| PathError::CurrentDir { source: err })
    }
}

pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
}

pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

pub fn xdg_data_home() -> PathBuf {
    env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Root of depot's data: `$DEPOT_ROOT`, else `$XDG_DATA_HOME/depot`.
pub fn default_root() -> PathBuf {
    env::var("DEPOT_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| xdg_data_home().join("depot"))
}

/// Location of the configuration file: `$DEPOT_CONFIG`, else
/// `$XDG_CONFIG_HOME/depot/config.toml`.
pub fn default_config_path() -> PathBuf {
    match env::var("DEPOT_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => xdg_config_home().join("depot").join("config.toml"),
    }
}

fn expand_variables(path: &str) -> Result<String, PathError> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let var_name = consume_until(&mut chars, '}')?;
                    expand_env_var(&var_name, &mut result, path)?;
                } else {
                    let var_name = consume_var_name(&mut chars);
                    if var_name.is_empty() {
                        result.push('$');
                    } else {
                        expand_env_var(&var_name, &mut result, path)?;
                    }
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn consume_until(chars: &mut Peekable<Chars>, delimiter: char) -> Result<String, PathError> {
    let mut var_name = String::new();

    for c in chars.by_ref() {
        if c == delimiter {
            return Ok(var_name);
        }
        var_name.push(c);
    }

    Err(PathError::UnclosedVariable {
        input: format!("${{{var_name}"),
    })
}

fn consume_var_name(chars: &mut Peekable<Chars>) -> String {
    let mut var_name = String::new();

    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            var_name.push(c);
            chars.next();
        } else {
            break;
        }
    }

    var_name
}

fn expand_env_var(var_name: &str, result: &mut String, original: &str) -> Result<(), PathError> {
    match var_name {
        "HOME" => result.push_str(&home_dir().to_string_lossy()),
        "DEPOT_ROOT" => result.push_str(&default_root().to_string_lossy()),
        _ => {
            let value = env::var(var_name).map_err(|_| {
                PathError::MissingEnvVar {
                    var: var_name.into(),
                    input: original.into(),
                }
            })?;
            result.push_str(&value);
        }
    }
    Ok(())
}
