//! Binary size units used for allocation arithmetic.

/// One kibibyte.
pub const KIB: u64 = 1024;
/// One mebibyte.
pub const MIB: u64 = KIB * 1024;
/// One gibibyte.
pub const GIB: u64 = MIB * 1024;

/// Render a byte count with the largest exact binary unit.
///
/// Sizes that are not a whole multiple of any unit are printed in bytes;
/// the harness only ever allocates round sizes, so this stays exact.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB && bytes % GIB == 0 {
        format!("{} GiB", bytes / GIB)
    } else if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KiB", bytes / KIB)
    } else {
        format!("{bytes} B")
    }
}
