#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use unfuddle_jira::config::MigrationConfig;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        unfuddle_jira::logging::init_test_logging();
    });
}

/// A small but complete backup: two people, one project with custom fields,
/// two milestones sharing a title, three tickets with a bidirectional link,
/// comments and attachments.
pub const BACKUP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<account>
  <subdomain>acme</subdomain>
  <people type="array">
    <person>
      <id>1</id>
      <username>ann</username>
      <first-name>Ann</first-name>
    </person>
    <person>
      <id>2</id>
      <username></username>
      <first-name>Bob</first-name>
    </person>
  </people>
  <projects type="array">
    <project>
      <id>42</id>
      <title>Widget</title>
      <ticket-field1-title>Component</ticket-field1-title>
      <ticket-field2-title></ticket-field2-title>
      <ticket-field3-title>Browser</ticket-field3-title>
      <custom-field-values>
        <custom-field-value>
          <id>100</id>
          <field-number>1</field-number>
          <value>Backend</value>
        </custom-field-value>
        <custom-field-value>
          <id>300</id>
          <field-number>3</field-number>
          <value>Firefox</value>
        </custom-field-value>
      </custom-field-values>
      <severities>
        <severity>
          <id>5</id>
          <name>Critical</name>
        </severity>
      </severities>
      <milestones>
        <milestone>
          <id>m1</id>
          <title>Release 1.0</title>
          <description>First `release`</description>
          <completed>true</completed>
          <archived>false</archived>
          <person-responsible-id>1</person-responsible-id>
          <created-at>2014-01-01T08:00:00Z</created-at>
          <updated-at>2014-01-02T08:00:00Z</updated-at>
          <due-on>2014-05-01</due-on>
        </milestone>
        <milestone>
          <id>m2</id>
          <title>Release 1.0</title>
          <completed>false</completed>
          <archived>false</archived>
          <due-on nil="true"></due-on>
        </milestone>
      </milestones>
      <tickets>
        <ticket>
          <number>7</number>
          <summary>Second, with "quotes"</summary>
          <status>new</status>
          <milestone-id>m2</milestone-id>
          <reporter-id>1</reporter-id>
          <associated-tickets>
            <ticket>
              <number>3</number>
            </ticket>
          </associated-tickets>
          <comments>
          </comments>
          <attachments>
          </attachments>
        </ticket>
        <ticket>
          <number>3</number>
          <summary>First</summary>
          <description>See [docs](http://example.com)</description>
          <status>closed</status>
          <resolution>fixed</resolution>
          <resolution-description>done; shipped</resolution-description>
          <severity-id>5</severity-id>
          <assignee-id>1</assignee-id>
          <reporter-id>2</reporter-id>
          <created-at>2014-02-01T08:00:00Z</created-at>
          <updated-at>2014-02-02T10:00:00Z</updated-at>
          <due-on>2014-03-09</due-on>
          <milestone-id>m1</milestone-id>
          <field1-value-id>100</field1-value-id>
          <field3-value-id>999</field3-value-id>
          <associated-tickets>
            <ticket>
              <number>7</number>
            </ticket>
          </associated-tickets>
          <comments>
            <comment>
              <created-at>2014-02-01T09:00:00Z</created-at>
              <author-id>2</author-id>
              <body>use `x`; ok</body>
              <attachments>
                <attachment>
                  <id>11</id>
                  <filename>trace.log</filename>
                </attachment>
              </attachments>
            </comment>
          </comments>
          <attachments>
            <attachment>
              <id>10</id>
              <filename>shot.png</filename>
            </attachment>
          </attachments>
        </ticket>
        <ticket>
          <number>12</number>
          <summary>Third</summary>
          <status>accepted</status>
        </ticket>
      </tickets>
    </project>
  </projects>
</account>
"#;

/// Temporary directory laid out like an unpacked backup.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_test_logging();
        let dir = TempDir::new().expect("Failed to create temp dir");
        let workspace = Self { dir };
        workspace.write("backup.complete/backup.xml", BACKUP_XML);
        workspace.write("backup.complete/media/attachments/10", "png bytes");
        workspace.write("backup.complete/media/attachments/11", "log bytes");
        workspace
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write file");
    }

    /// Config pointing at this workspace.
    pub fn config(&self) -> MigrationConfig {
        MigrationConfig {
            project_key: "ACME".to_string(),
            backup_file: self.join("backup.complete/backup.xml"),
            attachments_dir: self.join("backup.complete/media/attachments"),
            attachments_output_dir: self.join("jira-attachments"),
            output_file: self.join("output.csv"),
            ..MigrationConfig::default()
        }
    }

    /// `u2j` command running inside the workspace with a clean environment.
    pub fn u2j(&self) -> Command {
        let mut cmd = Command::cargo_bin("u2j").expect("u2j binary");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env_remove("U2J_CONFIG")
            .env_remove("U2J_PROJECT_KEY")
            .env_remove("U2J_ISSUE_NUMBER_OFFSET");
        cmd
    }
}

/// Parse CSV text into rows of cells.
pub fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("open csv");
    reader
        .records()
        .map(|record| {
            record
                .expect("csv record")
                .iter()
                .map(ToString::to_string)
                .collect()
        })
        .collect()
}
