#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use mentorship_github::{Envelope, GraphqlRequest, GraphqlTransport, RemoteError};
use serde_json::{json, Value};

/// Replays canned responses in order and records every request it was given.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<Envelope, RemoteError>>>,
    requests: RefCell<Vec<GraphqlRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, body: Value) -> Self {
        let envelope: Envelope = serde_json::from_value(body).expect("scripted envelope");
        self.responses.borrow_mut().push_back(Ok(envelope));
        self
    }

    pub fn fail(self, error: RemoteError) -> Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests.borrow().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.operation_name())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl GraphqlTransport for ScriptedTransport {
    fn execute(&self, request: &GraphqlRequest) -> Result<Envelope, RemoteError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(RemoteError::Transport {
                    message: format!("no scripted response for {}", request.operation_name()),
                })
            })
    }
}

pub fn not_found(field: &str) -> Value {
    json!({
        "data": { field: null },
        "errors": [{
            "type": "NOT_FOUND",
            "path": [field],
            "message": format!("Could not resolve to a {field}"),
        }]
    })
}

pub fn account(field: &str, id: &str, login: &str) -> Value {
    json!({ "data": { field: { "id": id, "login": login } } })
}

pub fn viewer(id: &str, login: &str) -> Value {
    account("viewer", id, login)
}

pub fn created_project(id: &str, number: u64, title: &str) -> Value {
    json!({
        "data": { "createProjectV2": { "projectV2": {
            "id": id,
            "number": number,
            "title": title,
            "url": format!("https://github.com/orgs/acme/projects/{number}"),
        } } }
    })
}

pub fn owner_projects(projects: &[(&str, u64, &str)]) -> Value {
    let nodes: Vec<Value> = projects
        .iter()
        .map(|(id, number, title)| json!({ "id": id, "number": number, "title": title, "url": null }))
        .collect();
    json!({ "data": { "node": { "projectsV2": { "nodes": nodes } } } })
}

pub fn draft_item(id: &str) -> Value {
    json!({ "data": { "addProjectV2DraftIssue": { "projectItem": {
        "id": id,
        "content": { "id": format!("DI_{id}") },
    } } } })
}

pub fn updated_draft(id: &str) -> Value {
    json!({ "data": { "updateProjectV2DraftIssue": { "draftIssue": { "id": id } } } })
}

pub fn error_of_type(kind: &str, message: &str) -> Value {
    json!({ "data": null, "errors": [{ "type": kind, "message": message }] })
}
