// Embedded migrations are read by `sqlx::migrate!` at compile time.
fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
