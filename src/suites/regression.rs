//! Preallocation regression checks.
//!
//! Verifies that preallocating space in a file grows `allocationSize` without
//! moving `endOfFile`, and that buffered writes stay invisible to the
//! filesystem until flushed. Can run against a freshly created pool or, with
//! the pool step skipped, against any existing directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::errors::{HarnessError, Result};
use crate::core::units::format_bytes;
use crate::probe::MetadataProbe;
use crate::pool::lifecycle::{DeviceSpec, OptionMap};
use crate::resource::files::{backing_file, remove_file_teardown};
use crate::resource::scope::{run_scope, ResourceScope};
use crate::suites::SuiteDeps;

/// Run the regression checks, provisioning a single-device pool under
/// `work_dir` first unless `no_pool` is set.
pub fn run(deps: &SuiteDeps<'_>, work_dir: &Path, no_pool: bool) -> Result<()> {
    let probe = MetadataProbe::new(std::sync::Arc::clone(&deps.platform));

    if no_pool {
        preallocation_checks(&probe, work_dir)?;
    } else {
        run_scope(|scope| {
            let device = backing_file(scope, &work_dir.join("test.dat"), deps.backing.file_size_bytes)?;
            let lifecycle = deps.lifecycle();
            let no_opts = OptionMap::new();
            lifecycle.with_pool(
                "test",
                &[DeviceSpec::path(&device)],
                &no_opts,
                &no_opts,
                |pool| {
                    deps.logger.info(format!(
                        "Created pool \"{}\" backed by {} ({}), mounted in {}",
                        pool.name(),
                        device.display(),
                        format_bytes(deps.backing.file_size_bytes),
                        pool.mount_path().display()
                    ));
                    preallocation_checks(&probe, pool.mount_path())
                },
            )
        })?;
    }

    deps.logger.info("PASSED");
    Ok(())
}

/// The ladder itself: sizes are checked after creation, after preallocation,
/// after a buffered write, and after close.
pub fn preallocation_checks(probe: &MetadataProbe, dir: &Path) -> Result<()> {
    let path = dir.join("testfile.bin");
    run_scope(|scope: &mut ResourceScope| {
        let file = File::create(&path).map_err(|e| HarnessError::io(&path, e))?;
        scope.defer(remove_file_teardown(path.clone()));

        let snap = probe.snapshot(&file, &path)?;
        expect(
            &path,
            "after creation",
            (0, 0),
            (snap.allocation_size, snap.end_of_file),
        )?;

        probe.preallocate(&file, 512)?;
        let snap = probe.snapshot(&file, &path)?;
        expect(
            &path,
            "after preallocation",
            (snap.round_to_cluster(512), 0),
            (snap.allocation_size, snap.end_of_file),
        )?;

        // Bytes held in the writer's buffer must not move end-of-file yet.
        let mut writer = BufWriter::new(&file);
        writer
            .write_all(&[0x55; 117])
            .map_err(|e| HarnessError::io(&path, e))?;
        let snap = probe.snapshot(&file, &path)?;
        expect(
            &path,
            "after buffered write",
            (snap.round_to_cluster(512), 0),
            (snap.allocation_size, snap.end_of_file),
        )?;

        writer
            .flush()
            .map_err(|e| HarnessError::io(&path, e))?;
        drop(writer);
        drop(file);

        let snap = probe.snapshot_path(&path)?;
        expect(
            &path,
            "after close",
            (snap.round_to_cluster(117), 117),
            (snap.allocation_size, snap.end_of_file),
        )?;

        Ok(())
    })
}

fn expect(path: &Path, when: &str, want: (u64, u64), got: (u64, u64)) -> Result<()> {
    if want == got {
        Ok(())
    } else {
        Err(HarnessError::Probe {
            path: path.to_path_buf(),
            details: format!(
                "{when}: expected allocation={} eof={}, got allocation={} eof={}",
                want.0, want.1, got.0, got.1
            ),
        })
    }
}
