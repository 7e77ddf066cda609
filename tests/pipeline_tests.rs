mod common;

use app_packager::bundler::tool::Tool;
use app_packager::bundler::{
    Error, LinuxSettings, PackageType, Packager, PackagerPhase, PlatformSettings, RuntimeSettings,
};
use common::{Fixture, RecordingInvoker};
use std::sync::Arc;

fn data_entries(spec: &app_packager::bundler::tool::ToolInvocationSpec) -> usize {
    spec.configuration
        .child("dataSet")
        .map(|set| set.children_named("data").count())
        .unwrap_or(0)
}

#[tokio::test]
async fn demo_app_without_runtime() {
    let fixture = Fixture::new();
    let invoker = Arc::new(RecordingInvoker::default());
    let mut packager =
        Packager::with_invoker(fixture.demo().build().unwrap(), invoker.clone()).unwrap();

    let artifacts = packager.create_app().await.unwrap();

    let out = fixture.output();
    assert!(out.join("demo/demo").is_file());
    assert!(out.join("demo-1.0-runnable.jar").is_file());
    assert!(out.join("demo/libs/a.jar").is_file());
    assert!(!out.join("demo/jre").exists());
    assert!(packager.bundle().unwrap().runtime_folder.is_none());

    assert_eq!(invoker.tools(), vec![Tool::Jdeb, Tool::Rpmbuild]);
    let deb = &invoker.calls()[0];
    let directory = deb.configuration.child("dataSet").unwrap().children()[0].clone();
    assert_eq!(directory.child_text("excludes"), Some("demo"));
    assert_eq!(data_entries(deb), 4);

    let kinds: Vec<_> = artifacts.iter().map(|a| a.package_type).collect();
    assert_eq!(kinds, vec![PackageType::Deb, PackageType::Rpm]);
    assert_eq!(artifacts[0].path, out.join("demo_1.0.deb"));
    assert_eq!(artifacts[1].path, out.join("demo_1.0.rpm"));
    assert_eq!(artifacts[0].sha256.len(), 64);

    assert_eq!(packager.state(), PackagerPhase::Done);
    let phases: Vec<_> = packager.history().iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![
            PackagerPhase::Init,
            PackagerPhase::StructureAssembled,
            PackagerPhase::PlatformAppCreated,
            PackagerPhase::InstallersGenerated,
            PackagerPhase::Done,
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn launcher_is_script_followed_by_jar() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new();
    let settings = fixture.demo().generate_installers(false).build().unwrap();
    let mut packager =
        Packager::with_invoker(settings, Arc::new(RecordingInvoker::default())).unwrap();
    packager.create_app().await.unwrap();

    let out = fixture.output();
    let launcher = std::fs::read(out.join("demo/demo")).unwrap();
    let jar = std::fs::read(out.join("demo-1.0-runnable.jar")).unwrap();
    assert!(launcher.starts_with(b"#!/usr/bin/env bash"));
    assert!(launcher.ends_with(&jar));

    let mode = std::fs::metadata(out.join("demo/demo")).unwrap().permissions().mode();
    assert_ne!(mode & 0o100, 0);
    assert_eq!(packager.state(), PackagerPhase::Done);
}

#[tokio::test]
async fn rpm_icon_is_synthesized_as_xpm() {
    let fixture = Fixture::new();
    let invoker = Arc::new(RecordingInvoker::default());
    let mut packager =
        Packager::with_invoker(fixture.demo().build().unwrap(), invoker.clone()).unwrap();
    packager.create_app().await.unwrap();

    let xpm = fixture.output().join("assets/demo.xpm");
    assert!(xpm.is_file());
    let rpm = &invoker.calls()[1];
    assert_eq!(rpm.configuration.child_text("icon"), Some(&*xpm.to_string_lossy()));
}

#[tokio::test]
async fn first_installer_failure_aborts() {
    let fixture = Fixture::new();
    let invoker = Arc::new(RecordingInvoker::failing_on(Tool::Jdeb));
    let mut packager =
        Packager::with_invoker(fixture.demo().build().unwrap(), invoker.clone()).unwrap();

    let err = packager.create_app().await.unwrap_err();
    assert!(matches!(err, Error::InstallerGeneration { format: "deb", .. }));
    assert!(matches!(err.root_cause(), Error::ExternalTool { .. }));
    assert_eq!(invoker.tools(), vec![Tool::Jdeb]);
    assert_eq!(packager.state(), PackagerPhase::Failed);
    assert!(!fixture.output().join("demo_1.0.rpm").exists());
}

#[tokio::test]
async fn prebuilt_runtime_is_embedded() {
    let fixture = Fixture::new();
    let runtime = fixture.runtime();
    let settings = fixture
        .demo()
        .runtime(RuntimeSettings {
            bundle: true,
            runtime_path: Some(runtime),
            ..Default::default()
        })
        .platform(PlatformSettings::Linux(LinuxSettings {
            generate_rpm: false,
            ..Default::default()
        }))
        .build()
        .unwrap();
    let invoker = Arc::new(RecordingInvoker::default());
    let mut packager = Packager::with_invoker(settings, invoker.clone()).unwrap();
    packager.create_app().await.unwrap();

    let out = fixture.output();
    assert!(out.join("demo/jre/bin/java").is_file());
    assert!(out.join("demo/jre/lib/modules").is_file());
    assert_eq!(invoker.tools(), vec![Tool::Jdeb]);

    let deb = &invoker.calls()[0];
    assert_eq!(data_entries(deb), 5);
    let directory = deb.configuration.child("dataSet").unwrap().children()[0].clone();
    assert_eq!(directory.child_text("excludes"), Some("demo,jre/bin/java"));
}

#[tokio::test]
async fn generic_bundles_follow_installers() {
    let fixture = Fixture::new();
    let settings = fixture
        .demo()
        .create_tarball(true)
        .create_zipball(true)
        .build()
        .unwrap();
    let mut packager =
        Packager::with_invoker(settings, Arc::new(RecordingInvoker::default())).unwrap();
    let artifacts = packager.create_app().await.unwrap();

    let kinds: Vec<_> = artifacts.iter().map(|a| a.package_type).collect();
    assert_eq!(
        kinds,
        vec![PackageType::Deb, PackageType::Rpm, PackageType::Tarball, PackageType::Zipball]
    );
    assert!(fixture.output().join("demo_1.0.tar.gz").is_file());
    assert!(fixture.output().join("demo_1.0.zip").is_file());
}

#[tokio::test]
async fn invalid_paths_fail_before_writing() {
    let fixture = Fixture::new();
    let settings = fixture
        .demo()
        .dependencies(vec![fixture.path().join("lib/missing.jar")])
        .build()
        .unwrap();
    let invoker = Arc::new(RecordingInvoker::default());
    let mut packager = Packager::with_invoker(settings, invoker.clone()).unwrap();

    let err = packager.create_app().await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!fixture.output().exists());
    assert!(invoker.calls().is_empty());
    assert_eq!(packager.state(), PackagerPhase::Failed);
}

#[cfg(unix)]
#[tokio::test]
async fn deb_output_is_reproducible() {
    let fixture = Fixture::new();
    let settings = fixture
        .demo()
        .platform(PlatformSettings::Linux(LinuxSettings {
            generate_rpm: false,
            ..Default::default()
        }))
        .build()
        .unwrap();

    let mut first = Packager::new(settings.clone()).unwrap();
    let artifacts = first.create_app().await.unwrap();
    let deb = artifacts[0].path.clone();
    let first_bytes = std::fs::read(&deb).unwrap();

    let mut second = Packager::new(settings).unwrap();
    second.create_app().await.unwrap();
    let second_bytes = std::fs::read(&deb).unwrap();

    assert!(first_bytes.starts_with(b"!<arch>\n"));
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn modular_dependency_stays_out_of_the_reduced_runtime() {
    let fixture = Fixture::new();
    let jdk = fixture.jdk(&["java.base", "java.sql"]);
    let settings = fixture
        .demo()
        .runtime(RuntimeSettings {
            bundle: true,
            jdk_path: Some(jdk.clone()),
            ..Default::default()
        })
        .generate_installers(false)
        .build()
        .unwrap();
    let invoker = Arc::new(RecordingInvoker::with_jdeps(
        "demo-1.0-runnable.jar -> com.lib\n\
         demo-1.0-runnable.jar -> java.base\n\
         com.lib -> java.base\n\
         com.lib -> java.sql\n",
    ));
    let mut packager = Packager::with_invoker(settings, invoker.clone()).unwrap();
    packager.create_app().await.unwrap();

    assert_eq!(invoker.tools(), vec![Tool::Jdeps, Tool::Jlink]);
    let args = invoker.calls()[1].args();
    let at = args.iter().position(|a| a == "--add-modules").unwrap();
    assert_eq!(args[at + 1], "java.base,java.sql");
    assert_eq!(args[at - 1], jdk.join("jmods").to_string_lossy());
    assert_eq!(packager.state(), PackagerPhase::Done);
}
