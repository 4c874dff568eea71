#![allow(dead_code)]

use std::io::Write;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::fixture::{ChildPath, PathChild, PathCreateDir};
use flate2::Compression;
use flate2::write::GzEncoder;
use indoc::formatdoc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub(crate) const BIN_NAME: &str = "wheelhouse";

/// A temporary directory with a `--find-links` directory of fixture distributions and a
/// destination directory.
pub(crate) struct TestContext {
    pub(crate) temp_dir: TempDir,
    pub(crate) find_links: ChildPath,
    pub(crate) dest: ChildPath,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let find_links = temp_dir.child("wheels");
        find_links.create_dir_all().unwrap();
        let dest = temp_dir.child("dest");
        Self {
            temp_dir,
            find_links,
            dest,
        }
    }

    /// A `wheelhouse` command with the environment cleared of `WHEELHOUSE_*` variables.
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::cargo_bin(BIN_NAME).unwrap();
        for (key, _) in std::env::vars() {
            if key.starts_with("WHEELHOUSE_") {
                command.env_remove(key);
            }
        }
        command.current_dir(self.temp_dir.path());
        command
    }

    /// A `wheelhouse download` command that only searches the fixture directory.
    pub(crate) fn download(&self) -> Command {
        let mut command = self.command();
        command
            .arg("download")
            .arg("--no-config")
            .arg("--no-index")
            .arg("--find-links")
            .arg(self.find_links.path())
            .arg("--dest")
            .arg(self.dest.path());
        command
    }

    /// Write a wheel to the fixture directory. The filename determines the name and version.
    pub(crate) fn wheel(&self, filename: &str, requires_dist: &[&str]) -> ChildPath {
        let wheel = self.find_links.child(filename);
        write_wheel(wheel.path(), filename, requires_dist);
        wheel
    }

    /// Write a gzipped source archive with Metadata 2.2 to the fixture directory.
    pub(crate) fn sdist(&self, name: &str, version: &str, requires_dist: &[&str]) -> ChildPath {
        let sdist = self.find_links.child(format!("{name}-{version}.tar.gz"));
        write_sdist(sdist.path(), name, version, requires_dist);
        sdist
    }
}

fn metadata(metadata_version: &str, name: &str, version: &str, requires_dist: &[&str]) -> String {
    let requires_dist = requires_dist
        .iter()
        .map(|requirement| format!("Requires-Dist: {requirement}\n"))
        .collect::<String>();
    formatdoc! {"
        Metadata-Version: {metadata_version}
        Name: {name}
        Version: {version}
        {requires_dist}"
    }
}

pub(crate) fn write_wheel(path: &std::path::Path, filename: &str, requires_dist: &[&str]) {
    let mut parts = filename.split('-');
    let name = parts.next().unwrap();
    let version = parts.next().unwrap();

    let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer
        .start_file(format!("{name}-{version}.dist-info/METADATA"), options)
        .unwrap();
    writer
        .write_all(metadata("2.1", name, version, requires_dist).as_bytes())
        .unwrap();
    writer.finish().unwrap();
}

pub(crate) fn write_sdist(path: &std::path::Path, name: &str, version: &str, requires_dist: &[&str]) {
    let pkg_info = metadata("2.2", name, version, requires_dist);

    let encoder = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(pkg_info.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(
            &mut header,
            format!("{name}-{version}/PKG-INFO"),
            pkg_info.as_bytes(),
        )
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}
