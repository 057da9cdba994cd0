pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# CLUSTERLOG RECEIVER CONFIGURATION
# =============================================================================
# Every setting has a default, so any section (or the whole file) may be
# omitted. Command-line flags (--listen, --out, --batches, --trace, -v, -q)
# override what is written here.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/clusterlog/config.yml
#   3. /etc/clusterlog/config.yml
#
# $env{VAR} references are expanded before parsing; ~ is expanded in paths.

# Address and port to receive log datagrams on. An empty host (":5005")
# or 0.0.0.0 accepts messages from any host; use 127.0.0.1 to restrict the
# receiver to local clients.
listen: "0.0.0.0:5005"

output:
  # Append-only file that receives one line per record. Remove this key to
  # write to the console instead.
  path: ~/clusterlog.log

  # Records below this level are dropped.
  # One of: trace, debug, info, warning, error, critical, or an integer.
  min_level: info

batch:
  # Records to hold in memory before writing them out together. 0 writes
  # each record as soon as it arrives. Buffered records are always flushed
  # on SIGINT/SIGTERM.
  capacity: 0

  # Optional: a record at or above this level flushes the batch immediately.
  # Only meaningful when capacity > 0.
  # flush_level: error

envelope:
  # Each datagram starts with a 4-byte length header. It is ignored unless
  # this is true, in which case datagrams whose header disagrees with their
  # size are discarded.
  strict_length: false
"#
    .to_string()
}
