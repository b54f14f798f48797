/// `<hostname>_<32 hex digits>`; unique per process start.
#[must_use]
pub fn generate_node_id() -> String {
    format!("{}_{:032x}", local_hostname(), rand::random::<u128>())
}

/// Falls back to `swarmer` when the OS reports no usable hostname.
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "swarmer".to_owned())
}
