//! Pool topology matrix: create/destroy cycles across vdev layouts, snapshot
//! and export handling, encrypted pools with file-based keys, and mount
//! identifier churn.

use std::fs::File;
use std::path::Path;

use crate::core::errors::{HarnessError, Result};
use crate::core::units::{format_bytes, KIB};
use crate::pool::lifecycle::{DeviceSpec, OptionMap};
use crate::pool::mounts::list_mounts;
use crate::resource::files::{backing_files, key_file_uri, random_key_file};
use crate::resource::scope::run_scope;
use crate::suites::{SuiteDeps, SuiteReport};

/// Run the whole matrix using backing files created under `work_dir`.
///
/// Case failures are collected; the suite always runs to the end and fails
/// afterwards if anything failed.
pub fn run(deps: &SuiteDeps<'_>, work_dir: &Path) -> Result<()> {
    let backing = &deps.backing;
    // The raidz cases need three vdevs.
    if backing.file_count < 3 {
        return Err(HarnessError::InvalidConfig {
            details: format!(
                "pool matrix requires backing.file_count >= 3, got {}",
                backing.file_count
            ),
        });
    }

    run_scope(|scope| {
        let bf = backing_files(scope, work_dir, backing.file_count, backing.file_size_bytes)?;
        deps.logger.info(format!(
            "Allocated {} backing files of {} under {}",
            backing.file_count,
            format_bytes(backing.file_size_bytes),
            work_dir.display()
        ));
        let devices: Vec<DeviceSpec> = bf.iter().map(DeviceSpec::path).collect();
        let lifecycle = deps.lifecycle();
        let no_opts = OptionMap::new();
        let mut report = SuiteReport::default();

        let log_mounts = |when: &str| {
            if let Ok(entries) = list_mounts(deps.ctx, deps.runner) {
                deps.logger.info(format!("Mounts {when}: {entries:?}"));
            }
        };

        let plain_cases: [(&str, &str, Vec<DeviceSpec>); 7] = [
            ("single file", "test01", devices[..1].to_vec()),
            ("two files", "test02", devices[..2].to_vec()),
            ("three files", "test03", devices[..3].to_vec()),
            (
                "mirror of two files",
                "test04",
                with_word("mirror", &devices[..2]),
            ),
            (
                "mirror of three files",
                "test05",
                with_word("mirror", &devices[..3]),
            ),
            (
                "raidz of three files",
                "test06",
                with_word("raidz", &devices[..3]),
            ),
            (
                "raidz1 of three files",
                "test07",
                with_word("raidz1", &devices[..3]),
            ),
        ];
        for (label, pool_name, pool_devices) in plain_cases {
            report.case(
                deps.logger,
                &format!("create pool backed by {label}"),
                || {
                    lifecycle.with_pool(pool_name, &pool_devices, &no_opts, &no_opts, |_pool| {
                        log_mounts(&format!("after {pool_name} pool create"));
                        Ok(())
                    })
                },
            );
        }

        report.case(deps.logger, "snapshot then export", || {
            lifecycle.with_pool("testsn01", &devices[..1], &no_opts, &no_opts, |pool| {
                log_mounts("after testsn01 pool create");
                touch(&pool.mount_path().join("test01.file"), KIB)?;
                deps.run_ok(deps.ctx.fs_tool(), &["snapshot", "testsn01@friday"])?;
                touch(&pool.mount_path().join("test02.file"), KIB)?;
                deps.run_ok(deps.ctx.pool_tool(), &["export", "testsn01"])?;
                pool.set_destroy(false); // already exported
                Ok(())
            })
        });

        report.case(deps.logger, "snapshot mounted then export", || {
            lifecycle.with_pool("testsn02", &devices[..1], &no_opts, &no_opts, |pool| {
                log_mounts("after testsn02 pool create");
                touch(&pool.mount_path().join("test01.file"), KIB)?;
                deps.run_ok(deps.ctx.fs_tool(), &["snapshot", "testsn02@friday"])?;
                touch(&pool.mount_path().join("test02.file"), KIB)?;
                deps.run_ok(deps.ctx.fs_tool(), &["mount", "testsn02@friday"])?;
                deps.run_ok(deps.ctx.pool_tool(), &["export", "testsn02"])?;
                pool.set_destroy(false); // already exported
                Ok(())
            })
        });

        report.case(deps.logger, "encrypted pool with file key", || {
            run_scope(|key_scope| {
                let key = random_key_file(key_scope, &work_dir.join("key01.key"), 32)?;
                let key_uri = key_file_uri(&key);

                let mut fs_opts = OptionMap::new();
                fs_opts.insert("encryption".to_string(), "aes-256-ccm".to_string());
                fs_opts.insert("keylocation".to_string(), key_uri);
                fs_opts.insert("keyformat".to_string(), "raw".to_string());

                let import_dir = work_dir.to_string_lossy().into_owned();
                lifecycle.with_pool("tank", &devices[..1], &no_opts, &fs_opts, |_pool| {
                    log_mounts("after tank pool create");
                    deps.run_ok(deps.ctx.fs_tool(), &["get", "keylocation", "tank"])?;
                    deps.run_ok(deps.ctx.pool_tool(), &["export", "tank"])?;
                    log_mounts("before pool import");
                    deps.run_ok(
                        deps.ctx.pool_tool(),
                        &["import", "-d", &import_dir, "-f", "-l", "tank"],
                    )?;
                    log_mounts("after pool import");
                    Ok(())
                })
            })
        });

        report.case(deps.logger, "mount identifier churn", || {
            for i in 1..26 {
                let name = format!("tank{i}");
                lifecycle.with_pool(&name, &devices[..1], &no_opts, &no_opts, |pool| {
                    log_mounts(&format!("after {name} pool create"));
                    touch(&pool.mount_path().join("test01.file"), KIB)
                })?;
            }
            Ok(())
        });

        report.finish(deps.logger)
    })
}

fn with_word(word: &str, devices: &[DeviceSpec]) -> Vec<DeviceSpec> {
    let mut v = vec![DeviceSpec::word(word)];
    v.extend_from_slice(devices);
    v
}

fn touch(path: &Path, size: u64) -> Result<()> {
    let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
    file.set_len(size).map_err(|e| HarnessError::io(path, e))?;
    Ok(())
}
