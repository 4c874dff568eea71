use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

use common::TestContext;

mod common;

#[test]
fn no_requirements() -> Result<()> {
    let context = TestContext::new();

    context
        .download()
        .assert()
        .code(2)
        .stderr(contains(
            "error: You must give at least one requirement to download",
        ));

    Ok(())
}

#[test]
fn empty_requirements_file() -> Result<()> {
    let context = TestContext::new();
    context.temp_dir.child("requirements.txt").touch()?;

    context
        .download()
        .arg("-r")
        .arg("requirements.txt")
        .assert()
        .success();

    Ok(())
}

#[test]
fn dependencies() -> Result<()> {
    let context = TestContext::new();
    context.wheel(
        "colander-1.0-py2.py3-none-any.whl",
        &["translationstring", "iso8601; python_version < '2'"],
    );
    context.wheel("translationstring-1.3-py2.py3-none-any.whl", &[]);

    context
        .download()
        .arg("colander")
        .assert()
        .success()
        .stderr(contains(
            "Successfully downloaded colander translationstring",
        ));

    context
        .dest
        .child("colander-1.0-py2.py3-none-any.whl")
        .assert(predicate::path::is_file());
    context
        .dest
        .child("translationstring-1.3-py2.py3-none-any.whl")
        .assert(predicate::path::is_file());

    Ok(())
}

#[test]
fn no_deps() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &["translationstring"]);
    context.wheel("translationstring-1.3-py2.py3-none-any.whl", &[]);

    context
        .download()
        .arg("--no-deps")
        .arg("colander")
        .assert()
        .success();

    context
        .dest
        .child("translationstring-1.3-py2.py3-none-any.whl")
        .assert(predicate::path::missing());

    Ok(())
}

#[test]
fn already_downloaded() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &[]);

    context
        .download()
        .arg("colander")
        .assert()
        .success()
        .stderr(contains("Saved"));

    context
        .download()
        .arg("colander")
        .assert()
        .success()
        .stderr(contains("File was already downloaded"));

    Ok(())
}

#[test]
fn newer_source_distribution_wins() -> Result<()> {
    let context = TestContext::new();
    context.wheel("source-0.8-py2.py3-none-any.whl", &[]);
    context.sdist("source", "1.0", &[]);

    context.download().arg("source").assert().success();

    context
        .dest
        .child("source-1.0.tar.gz")
        .assert(predicate::path::is_file());
    context
        .dest
        .child("source-0.8-py2.py3-none-any.whl")
        .assert(predicate::path::missing());

    Ok(())
}

#[test]
fn prefer_binary() -> Result<()> {
    let context = TestContext::new();
    context.wheel("source-0.8-py2.py3-none-any.whl", &[]);
    context.sdist("source", "1.0", &[]);

    context
        .download()
        .arg("--prefer-binary")
        .arg("source")
        .assert()
        .success();

    context
        .dest
        .child("source-0.8-py2.py3-none-any.whl")
        .assert(predicate::path::is_file());
    context
        .dest
        .child("source-1.0.tar.gz")
        .assert(predicate::path::missing());

    Ok(())
}

#[test]
fn prefer_binary_respects_requirement() -> Result<()> {
    let context = TestContext::new();
    context.wheel("source-0.8-py2.py3-none-any.whl", &[]);
    context.sdist("source", "1.0", &[]);

    context
        .download()
        .arg("--prefer-binary")
        .arg("source>0.9")
        .assert()
        .success();

    context
        .dest
        .child("source-1.0.tar.gz")
        .assert(predicate::path::is_file());

    Ok(())
}

#[test]
fn platform_alone_is_rejected() -> Result<()> {
    let context = TestContext::new();

    context
        .download()
        .arg("--platform")
        .arg("linux_x86_64")
        .arg("fake")
        .assert()
        .code(2)
        .stderr(contains("--only-binary=:all:").and(contains("--no-deps")));

    Ok(())
}

#[test]
fn conflicting_binary_policy() -> Result<()> {
    let context = TestContext::new();

    context
        .download()
        .arg("--platform")
        .arg("linux_x86_64")
        .arg("--only-binary=:all:")
        .arg("--no-binary=fake")
        .arg("fake")
        .assert()
        .code(2)
        .stderr(contains("conflicts with --no-binary=fake"));

    Ok(())
}

#[test]
fn custom_abi() -> Result<()> {
    let context = TestContext::new();
    context.wheel("fake-1.0-fk2-fakeabi-fake_platform.whl", &[]);

    context
        .download()
        .arg("--only-binary=:all:")
        .arg("--implementation")
        .arg("fk")
        .arg("--python-version")
        .arg("2")
        .arg("--abi")
        .arg("fakeabi")
        .arg("--platform")
        .arg("fake_platform")
        .arg("fake")
        .assert()
        .success();

    context
        .dest
        .child("fake-1.0-fk2-fakeabi-fake_platform.whl")
        .assert(predicate::path::is_file());

    Ok(())
}

#[test]
fn custom_abi_mismatch() -> Result<()> {
    let context = TestContext::new();
    context.wheel("fake-1.0-fk2-fakeabi-fake_platform.whl", &[]);

    context
        .download()
        .arg("--only-binary=:all:")
        .arg("--implementation")
        .arg("fk")
        .arg("--python-version")
        .arg("2")
        .arg("--abi")
        .arg("none")
        .arg("--platform")
        .arg("fake_platform")
        .arg("fake")
        .assert()
        .code(1)
        .stderr(
            contains("error: No matching distribution found for fake")
                .and(contains("Caused by: No wheel is compatible with the target ABI"))
                .and(contains("hint:")),
        );

    context
        .dest
        .child("fake-1.0-fk2-fakeabi-fake_platform.whl")
        .assert(predicate::path::missing());

    Ok(())
}

#[test]
fn macos_versions() -> Result<()> {
    let context = TestContext::new();
    context.wheel("fake-1.0-py2.py3-none-macosx_10_9_x86_64.whl", &[]);

    context
        .download()
        .arg("--only-binary=:all:")
        .arg("--platform")
        .arg("macosx_10_8_x86_64")
        .arg("fake")
        .assert()
        .code(1)
        .stderr(contains("No wheel is compatible with the target platform"));

    context
        .download()
        .arg("--only-binary=:all:")
        .arg("--platform")
        .arg("macosx_10_10_x86_64")
        .arg("fake")
        .assert()
        .success();

    context
        .dest
        .child("fake-1.0-py2.py3-none-macosx_10_9_x86_64.whl")
        .assert(predicate::path::is_file());

    Ok(())
}

#[test]
fn explicit_linux_platform_excludes_manylinux() -> Result<()> {
    let context = TestContext::new();
    context.wheel("fake-1.0-py2.py3-none-manylinux1_x86_64.whl", &[]);

    context
        .download()
        .arg("--only-binary=:all:")
        .arg("--platform")
        .arg("linux_x86_64")
        .arg("fake")
        .assert()
        .code(1)
        .stderr(contains("No wheel is compatible with the target platform"));

    Ok(())
}

#[test]
fn failures_are_collected() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &[]);

    context
        .download()
        .arg("missing")
        .arg("colander>2")
        .arg("colander")
        .assert()
        .code(1)
        .stderr(
            contains("No matching distribution found for missing")
                .and(contains("No matching distribution found for colander>2"))
                .and(contains("(available: 1.0)")),
        );

    Ok(())
}

#[test]
fn requirements_file() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &[]);
    context.wheel("fake-1.0-py2.py3-none-any.whl", &[]);
    context
        .temp_dir
        .child("requirements/base.txt")
        .write_str("# Locations are relative to this file.\n-f ../wheels\n--no-index\n\ncolander \\\n  >=1.0\n")?;
    context
        .temp_dir
        .child("requirements/dev.txt")
        .write_str("-r base.txt\nfake\n")?;

    context
        .command()
        .arg("download")
        .arg("--no-config")
        .arg("--dest")
        .arg(context.dest.path())
        .arg("-r")
        .arg("requirements/dev.txt")
        .assert()
        .success()
        .stderr(contains("Successfully downloaded colander fake"));

    Ok(())
}

#[test]
fn requirements_file_unsupported_option() -> Result<()> {
    let context = TestContext::new();
    context
        .temp_dir
        .child("requirements.txt")
        .write_str("colander\n-e ./colander\n")?;

    context
        .download()
        .arg("-r")
        .arg("requirements.txt")
        .assert()
        .code(2)
        .stderr(contains("at line 2").and(contains("Unsupported option `-e`")));

    Ok(())
}

#[test]
fn archive_path() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &["translationstring"]);
    context.wheel("translationstring-1.3-py2.py3-none-any.whl", &[]);

    context
        .download()
        .arg("./wheels/colander-1.0-py2.py3-none-any.whl")
        .assert()
        .success()
        .stderr(contains(
            "Successfully downloaded colander translationstring",
        ));

    Ok(())
}

#[test]
fn archive_path_is_tag_checked() -> Result<()> {
    let context = TestContext::new();
    context.wheel("fake-1.0-py2.py3-none-manylinux1_x86_64.whl", &[]);

    context
        .download()
        .arg("--only-binary=:all:")
        .arg("--platform")
        .arg("macosx_10_10_x86_64")
        .arg("./wheels/fake-1.0-py2.py3-none-manylinux1_x86_64.whl")
        .assert()
        .code(1)
        .stderr(contains("No wheel is compatible with the target platform"));

    Ok(())
}

#[test]
fn json_report() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &["translationstring>=1"]);
    context.wheel("translationstring-1.3-py2.py3-none-any.whl", &[]);

    let output = context
        .download()
        .arg("--json")
        .arg("colander")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output)?;
    let report = report.as_array().unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0]["name"], "colander");
    assert_eq!(report[0]["version"], "1.0");
    assert_eq!(
        report[0]["dependencies"],
        serde_json::json!([{ "name": "translationstring", "version": "1.3" }])
    );
    assert!(
        report[0]["url"]
            .as_str()
            .unwrap()
            .starts_with("file://")
    );
    assert!(
        report[1]["download_path"]
            .as_str()
            .unwrap()
            .ends_with("translationstring-1.3-py2.py3-none-any.whl")
    );

    Ok(())
}

#[test]
fn config_file() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &[]);
    context.temp_dir.child("wheelhouse.toml").write_str(
        r#"
        [download]
        no-index = true
        find-links = ["wheels"]
        dest = "dest"
        "#,
    )?;

    context
        .command()
        .arg("download")
        .arg("colander")
        .assert()
        .success();

    context
        .dest
        .child("colander-1.0-py2.py3-none-any.whl")
        .assert(predicate::path::is_file());

    Ok(())
}

#[test]
fn config_file_unknown_field() -> Result<()> {
    let context = TestContext::new();
    context
        .temp_dir
        .child("wheelhouse.toml")
        .write_str("[download]\nfind_links = [\"wheels\"]\n")?;

    context
        .command()
        .arg("download")
        .arg("colander")
        .assert()
        .code(2)
        .stderr(contains("Failed to parse").and(contains("unknown field `find_links`")));

    Ok(())
}

#[test]
fn quiet() -> Result<()> {
    let context = TestContext::new();
    context.wheel("colander-1.0-py2.py3-none-any.whl", &[]);

    context
        .command()
        .arg("--quiet")
        .arg("download")
        .arg("--no-config")
        .arg("--no-index")
        .arg("--find-links")
        .arg(context.find_links.path())
        .arg("--dest")
        .arg(context.dest.path())
        .arg("colander")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    Ok(())
}
