use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

const DEFAULT_FILTER: &str = "docking=info";

pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let tree = HierarchicalLayer::default()
        .with_writer(std::io::stderr)
        .with_indent_lines(true)
        .with_targets(true)
        .with_timer(Uptime::default());
    // A host may already have installed a subscriber; keep theirs.
    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}

/// Logs pointer traffic at trace level under a dedicated target so it can be
/// switched on separately (`RUST_LOG=docking::pointer=trace`).
pub fn trace_pointer(what: &str, x: f64, y: f64) {
    tracing::trace!(target: "docking::pointer", x, y, "{what}");
}
