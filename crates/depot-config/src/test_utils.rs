/// Runs `f` with `set` exported and `unset` removed from the process
/// environment, restoring every touched variable afterwards.
///
/// Callers must be `#[serial]`: the environment is process-global.
pub fn with_env<F>(set: &[(&str, &str)], unset: &[&str], f: F)
where
    F: FnOnce(),
{
    let saved: Vec<(String, Option<String>)> = set
        .iter()
        .map(|(k, _)| *k)
        .chain(unset.iter().copied())
        .map(|k| (k.to_string(), std::env::var(k).ok()))
        .collect();

    for key in unset {
        std::env::remove_var(key);
    }
    for (key, value) in set {
        std::env::set_var(key, value);
    }

    f();

    for (key, old_value) in saved {
        match old_value {
            Some(v) => std::env::set_var(&key, v),
            None => std::env::remove_var(&key),
        }
    }
}
