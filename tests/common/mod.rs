//! Shared fixtures for the HTTP-level tests.
//!
//! `FakeAsana` is a stateful stand-in for the Asana API: mutations change the data it
//! serves, so consecutive runs observe each other's effects.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const PROJECT: &str = "proj-1";
pub const WORKSPACE: &str = "ws-1";

/// 2024-02-01 12:00 UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
}

pub fn task(gid: &str, name: &str, due_on: Option<&str>, completed: bool) -> Value {
    json!({
        "gid": gid,
        "name": name,
        "completed": completed,
        "due_on": due_on,
        "due_at": null,
        "num_subtasks": 0,
        "tags": [],
        "custom_fields": []
    })
}

pub fn subtask(gid: &str, name: &str, due_on: Option<&str>, completed: bool) -> Value {
    json!({
        "gid": gid,
        "name": name,
        "completed": completed,
        "due_on": due_on,
        "due_at": null
    })
}

pub fn page(data: Vec<Value>, next_uri: Option<String>) -> Value {
    json!({
        "data": data,
        "next_page": next_uri.map(|uri| json!({"offset": "x", "path": "/", "uri": uri}))
    })
}

/// A mutation received by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AddTag { task: String, tag: String },
    RemoveTag { task: String, tag: String },
    Update { task: String, data: Value },
    Comment { task: String, text: String },
    CreateTag { name: String },
}

#[derive(Default)]
pub struct FakeState {
    pub tags: Vec<Value>,
    pub tasks: Vec<Value>,
    pub subtasks: HashMap<String, Vec<Value>>,
    pub calls: Vec<Call>,
    next_gid: u32,
}

#[derive(Clone, Default)]
pub struct FakeAsana {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeAsana {
    pub fn new(tasks: Vec<Value>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().tasks = tasks;
        fake
    }

    pub fn with_tag(self, gid: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tags
            .push(json!({"gid": gid, "name": name}));
        self
    }

    pub fn with_subtasks(self, parent: &str, subtasks: Vec<Value>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(task) = state.tasks.iter_mut().find(|t| t["gid"] == parent) {
                task["num_subtasks"] = json!(subtasks.len());
            }
            state.subtasks.insert(parent.to_string(), subtasks);
        }
        self
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(any())
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn task(&self, gid: &str) -> Value {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t["gid"] == gid)
            .cloned()
            .unwrap()
    }
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"errors": [{"message": "Not found"}]}))
}

impl Respond for FakeAsana {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let segments: Vec<&str> = request
            .url
            .path()
            .trim_matches('/')
            .split('/')
            .collect();
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let data = body["data"].clone();
        let completed_since_now = request
            .url
            .query_pairs()
            .any(|(k, v)| k == "completed_since" && v == "now");

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["projects", gid]) => ok(json!({
                "gid": gid,
                "workspace": {"gid": WORKSPACE, "name": "Workspace"}
            })),
            ("GET", ["workspaces", _, "tags"]) => {
                ResponseTemplate::new(200).set_body_json(page(state.tags.clone(), None))
            }
            ("POST", ["tags"]) => {
                state.next_gid += 1;
                let name = data["name"].as_str().unwrap_or_default().to_string();
                let tag = json!({"gid": format!("created-{}", state.next_gid), "name": name});
                state.tags.push(tag.clone());
                state.calls.push(Call::CreateTag { name });
                ok(tag)
            }
            ("GET", ["projects", _, "tasks"]) => {
                let tasks: Vec<Value> = state
                    .tasks
                    .iter()
                    .filter(|t| !completed_since_now || t["completed"] != json!(true))
                    .cloned()
                    .collect();
                ResponseTemplate::new(200).set_body_json(page(tasks, None))
            }
            ("GET", ["tasks", gid, "subtasks"]) => {
                let subtasks = state.subtasks.get(*gid).cloned().unwrap_or_default();
                ResponseTemplate::new(200).set_body_json(page(subtasks, None))
            }
            ("POST", ["tasks", gid, action @ ("addTag" | "removeTag")]) => {
                let tag_gid = data["tag"].as_str().unwrap_or_default().to_string();
                let tag = state
                    .tags
                    .iter()
                    .find(|t| t["gid"] == tag_gid.as_str())
                    .cloned()
                    .unwrap_or_else(|| json!({"gid": tag_gid}));
                let Some(task) = state.tasks.iter_mut().find(|t| t["gid"] == *gid) else {
                    return not_found();
                };
                let tags = task["tags"].as_array_mut().unwrap();
                if *action == "addTag" {
                    if !tags.iter().any(|t| t["gid"] == tag_gid.as_str()) {
                        tags.push(tag);
                    }
                    state.calls.push(Call::AddTag {
                        task: gid.to_string(),
                        tag: tag_gid,
                    });
                } else {
                    tags.retain(|t| t["gid"] != tag_gid.as_str());
                    state.calls.push(Call::RemoveTag {
                        task: gid.to_string(),
                        tag: tag_gid,
                    });
                }
                ok(json!({}))
            }
            ("POST", ["tasks", gid, "stories"]) => {
                state.calls.push(Call::Comment {
                    task: gid.to_string(),
                    text: data["text"].as_str().unwrap_or_default().to_string(),
                });
                ok(json!({"gid": "story", "text": data["text"]}))
            }
            ("PUT", ["tasks", gid]) => {
                let Some(task) = state.tasks.iter_mut().find(|t| t["gid"] == *gid) else {
                    return not_found();
                };
                if let Some(name) = data.get("name") {
                    task["name"] = name.clone();
                }
                if let Some(fields) = data.get("custom_fields").and_then(|f| f.as_object()) {
                    for (field_gid, option_gid) in fields {
                        let values = task["custom_fields"].as_array_mut().unwrap();
                        values.retain(|v| v["gid"] != field_gid.as_str());
                        values.push(json!({"gid": field_gid, "enum_value": {"gid": option_gid}}));
                    }
                }
                let updated = task.clone();
                state.calls.push(Call::Update {
                    task: gid.to_string(),
                    data,
                });
                ok(updated)
            }
            _ => not_found(),
        }
    }
}
