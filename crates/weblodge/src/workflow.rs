//! GitHub Actions workflow deploying the application on push

use std::path::{Path, PathBuf};

pub const WORKFLOW_DIR: &str = ".github/workflows";
pub const WORKFLOW_FILE: &str = "weblodge.yml";

const TEMPLATE: &str = r#"name: WebLodge

on:
  push:
    branches:
      - {branch}

permissions:
  id-token: write
  contents: read

jobs:
  deploy:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4

      - uses: azure/login@v2
        with:
          client-id: ${{ secrets.AZURE_CLIENT_ID }}
          tenant-id: ${{ secrets.AZURE_TENANT_ID }}
          subscription-id: ${{ secrets.AZURE_SUBSCRIPTION_ID }}

      - name: Install WebLodge
        run: cargo install weblodge --locked

      # {dist}/azwebapp.zip must exist at this point
      - name: Deploy
        run: weblodge deploy --config-file {config_file}
"#;

pub fn workflow_path(root: &Path) -> PathBuf {
    root.join(WORKFLOW_DIR).join(WORKFLOW_FILE)
}

pub fn render(branch: &str, dist: &str, config_file: &str) -> String {
    TEMPLATE
        .replace("{branch}", branch)
        .replace("{dist}", dist)
        .replace("{config_file}", config_file)
}

/// Write the workflow under `root`, creating the folders
pub fn write(root: &Path, content: &str) -> std::io::Result<PathBuf> {
    let path = workflow_path(root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    Ok(path)
}
