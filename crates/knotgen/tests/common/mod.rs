use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_labels(&self, labels: &[&str]) {
        let mut content = labels.join("\n");
        content.push('\n');
        fs::write(self.root.path().join("labels.txt"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.path().join(relative)).unwrap()
    }

    #[allow(dead_code)]
    pub fn exists(&self, relative: &str) -> bool {
        self.root.path().join(relative).exists()
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// プロジェクト内で実行する knotgen（ユーザーの設定ファイルや KNOTGEN_* は見ない）
    #[allow(deprecated)]
    pub fn knotgen(&self) -> Command {
        let mut cmd = Command::cargo_bin("knotgen").unwrap();
        cmd.current_dir(self.root.path())
            .env("XDG_CONFIG_HOME", self.config_home())
            .env("HOME", self.root.path())
            .env("NO_COLOR", "1");
        for (key, _) in std::env::vars() {
            if key.starts_with("KNOTGEN_") {
                cmd.env_remove(key);
            }
        }
        cmd
    }

    fn config_home(&self) -> PathBuf {
        self.root.path().join(".config")
    }
}
