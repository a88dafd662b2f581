// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply directories written into temp dirs for tests.

use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use super::{reply_dir, CLIENT_ID};

pub(crate) struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub(crate) fn empty() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// One project "App" with one executable "app" and no compile groups.
    pub(crate) fn app() -> Self {
        let fixture = Self::empty();
        fixture.index("index-2024-01-01T00-00-00-0000.json", "codemodel-v2-1.json", "cache-v2-1.json");
        fixture.write(
            "codemodel-v2-1.json",
            json!({
                "paths": { "source": "/src/app", "build": "/src/app/build" },
                "configurations": [{
                    "name": "Debug",
                    "projects": [{ "name": "App", "directoryIndexes": [0], "targetIndexes": [0] }],
                    "targets": [{ "name": "app", "id": "app::@6890", "jsonFile": "target-app.json" }]
                }]
            }),
        );
        fixture.write(
            "target-app.json",
            json!({ "name": "app", "type": "EXECUTABLE", "paths": { "source": ".", "build": "." } }),
        );
        fixture.write(
            "cache-v2-1.json",
            json!({
                "entries": [
                    {
                        "name": "CMAKE_BUILD_TYPE",
                        "value": "Debug",
                        "type": "STRING",
                        "properties": [{ "name": "HELPSTRING", "value": "Build type" }]
                    }
                ]
            }),
        );
        fixture
    }

    pub(crate) fn build_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write an index pointing at the given codemodel and cache files.
    pub(crate) fn index(&self, name: &str, codemodel: &str, cache: &str) {
        self.write(
            name,
            json!({
                "cmake": {
                    "generator": { "name": "Ninja", "multiConfig": false },
                    "version": { "major": 3, "minor": 28, "string": "3.28.1" }
                },
                "reply": {
                    (format!("client-{}", CLIENT_ID)): {
                        "codemodel-v2": { "kind": "codemodel", "jsonFile": codemodel },
                        "cache-v2": { "kind": "cache", "jsonFile": cache }
                    }
                }
            }),
        );
    }

    pub(crate) fn write(&self, name: &str, value: Value) {
        self.write_raw(name, &serde_json::to_vec_pretty(&value).unwrap());
    }

    pub(crate) fn write_raw(&self, name: &str, bytes: &[u8]) {
        let dir = reply_dir(self.build_dir());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), bytes).unwrap();
    }
}
