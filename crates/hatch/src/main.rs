fn main() {
  if let Err(err) = hatch::run() {
    hatch::log_error!("{:#}", err);
    std::process::exit(1);
  }
}
