pub(crate) mod logger;
pub(crate) mod node_id;
pub(crate) mod signals;
