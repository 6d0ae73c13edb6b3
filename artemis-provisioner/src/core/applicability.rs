/// Whether an instance pinned to `target_host` is provisioned on
/// `current_host`. An unset or empty target applies everywhere; otherwise
/// the names must match exactly.
pub fn applies(target_host: Option<&str>, current_host: &str) -> bool {
    match target_host {
        None => true,
        Some(target) if target.is_empty() => true,
        Some(target) => target == current_host,
    }
}
