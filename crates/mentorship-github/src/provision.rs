//! Project provisioning: one project, one draft item per pair.

use mentorship_ingest::{item_title, render_card, NormalizedRecord, PairRecord, Provenance};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::envelope::decode;
use crate::{
    GraphqlRequest, GraphqlTransport, IdentityResolution, IdentityResolver, Lookup, RemoteError,
    ResolveError,
};

const CREATE_PROJECT: &str = "mutation CreateProject($ownerId: ID!, $title: String!) { \
    createProjectV2(input: {ownerId: $ownerId, title: $title}) { \
    projectV2 { id number title url } } }";

const OWNER_PROJECTS: &str = "query OwnerProjects($ownerId: ID!, $first: Int!) { \
    node(id: $ownerId) { \
    ... on User { projectsV2(first: $first) { nodes { id number title url } } } \
    ... on Organization { projectsV2(first: $first) { nodes { id number title url } } } } }";

const ADD_DRAFT_ITEM: &str = "mutation AddDraftItem($projectId: ID!, $title: String!, $body: String!) { \
    addProjectV2DraftIssue(input: {projectId: $projectId, title: $title, body: $body}) { \
    projectItem { id content { ... on DraftIssue { id } } } } }";

const UPDATE_DRAFT_ITEM: &str = "mutation UpdateDraftItem($draftIssueId: ID!, $title: String!, $body: String!) { \
    updateProjectV2DraftIssue(input: {draftIssueId: $draftIssueId, title: $title, body: $body}) { \
    draftIssue { id } } }";

const PROJECT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProvisionMode {
    /// Always create a fresh project.
    #[default]
    CreateNew,
    /// Use the first project whose title contains the requested title.
    ReuseExisting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedItem {
    pub item_id: String,
    /// The draft issue behind the item; what [`Provisioner::update_item`] edits.
    pub draft_issue_id: Option<String>,
    pub title: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub provenance: Provenance,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub owner: IdentityResolution,
    pub project: Project,
    pub created_project: bool,
    pub items: Vec<ProvisionedItem>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Owner(#[from] ResolveError),
    #[error("provisioning aborted after {} item(s): {source}", .completed.len())]
    Aborted {
        project: Option<Project>,
        completed: Vec<ProvisionedItem>,
        source: RemoteError,
    },
}

pub struct Provisioner<T> {
    transport: T,
}

impl<T: GraphqlTransport> Provisioner<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resolver(&self) -> IdentityResolver<&T> {
        IdentityResolver::new(&self.transport)
    }

    pub fn create_project(&self, owner_id: &str, title: &str) -> Result<Project, RemoteError> {
        let request = GraphqlRequest::new(
            CREATE_PROJECT,
            json!({ "ownerId": owner_id, "title": title }),
        );
        let created = self.transport.execute(&request)?.require("createProjectV2")?;
        let project: Project = decode(created["projectV2"].clone(), "projectV2")?;
        tracing::info!(project = %project.title, number = project.number, "created project");
        Ok(project)
    }

    /// First project owned by `owner_id` whose title contains `keyword`, ignoring case.
    pub fn find_project(
        &self,
        owner_id: &str,
        keyword: &str,
    ) -> Result<Option<Project>, RemoteError> {
        let request = GraphqlRequest::new(
            OWNER_PROJECTS,
            json!({ "ownerId": owner_id, "first": PROJECT_PAGE_SIZE }),
        );
        let node = match self.transport.execute(&request)?.lookup("node")? {
            Lookup::Found(node) => node,
            Lookup::Absent(_) => return Ok(None),
        };

        let projects: Vec<Project> = match node.pointer("/projectsV2/nodes") {
            Some(nodes) => decode(nodes.clone(), "projectsV2.nodes")?,
            None => Vec::new(),
        };
        let keyword = keyword.to_lowercase();
        Ok(projects
            .into_iter()
            .find(|p| p.title.to_lowercase().contains(&keyword)))
    }

    /// Returns the project and whether it was newly created.
    pub fn ensure_project(
        &self,
        owner_id: &str,
        title: &str,
        mode: ProvisionMode,
    ) -> Result<(Project, bool), RemoteError> {
        if mode == ProvisionMode::ReuseExisting {
            if let Some(project) = self.find_project(owner_id, title)? {
                tracing::info!(project = %project.title, "reusing existing project");
                return Ok((project, false));
            }
        }
        Ok((self.create_project(owner_id, title)?, true))
    }

    pub fn add_item(
        &self,
        project_id: &str,
        record: &PairRecord,
    ) -> Result<ProvisionedItem, RemoteError> {
        let title = item_title(record);
        let request = GraphqlRequest::new(
            ADD_DRAFT_ITEM,
            json!({ "projectId": project_id, "title": title, "body": render_card(record) }),
        );
        let added = self
            .transport
            .execute(&request)?
            .require("addProjectV2DraftIssue")?;
        let item_id = added
            .pointer("/projectItem/id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RemoteError::Malformed("draft issue has no projectItem.id".into()))?
            .to_string();

        let draft_issue_id = added
            .pointer("/projectItem/content/id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        tracing::debug!(item = %item_id, title = %title, "added project item");
        Ok(ProvisionedItem {
            item_id,
            draft_issue_id,
            title,
            provenance: record.provenance().clone(),
        })
    }

    /// Re-render the card of an existing draft item from `record`.
    ///
    /// Title and body are replaced as a whole. Returns the draft issue id.
    pub fn update_item(
        &self,
        draft_issue_id: &str,
        record: &PairRecord,
    ) -> Result<String, RemoteError> {
        let title = item_title(record);
        let request = GraphqlRequest::new(
            UPDATE_DRAFT_ITEM,
            json!({ "draftIssueId": draft_issue_id, "title": title, "body": render_card(record) }),
        );
        let updated = self
            .transport
            .execute(&request)?
            .require("updateProjectV2DraftIssue")?;
        let id = updated
            .pointer("/draftIssue/id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RemoteError::Malformed("updated draft has no draftIssue.id".into()))?
            .to_string();

        tracing::info!(draft = %id, title = %title, "updated project item");
        Ok(id)
    }

    /// Resolve `owner`, obtain a project, and add one item per valid record.
    ///
    /// Records in input order; invalid ones are reported as skipped. The first
    /// remote failure stops the run and hands back everything created so far.
    pub fn provision(
        &self,
        owner: &str,
        title: &str,
        records: &[NormalizedRecord],
        mode: ProvisionMode,
    ) -> Result<ProvisionReport, ProvisionError> {
        let owner = self.resolver().resolve(owner)?;

        let (project, created_project) =
            self.ensure_project(&owner.id, title, mode)
                .map_err(|source| ProvisionError::Aborted {
                    project: None,
                    completed: Vec::new(),
                    source,
                })?;

        let mut items = Vec::new();
        let mut skipped = Vec::new();
        for normalized in records {
            if !normalized.valid {
                tracing::warn!(
                    provenance = %normalized.record.provenance(),
                    warnings = ?normalized.warnings,
                    "skipping invalid pair"
                );
                skipped.push(SkippedRecord {
                    provenance: normalized.record.provenance().clone(),
                    warnings: normalized.warnings.clone(),
                });
                continue;
            }

            match self.add_item(&project.id, &normalized.record) {
                Ok(item) => items.push(item),
                Err(source) => {
                    tracing::error!(
                        provenance = %normalized.record.provenance(),
                        completed = items.len(),
                        error = %source,
                        "aborting provisioning"
                    );
                    return Err(ProvisionError::Aborted {
                        project: Some(project),
                        completed: items,
                        source,
                    });
                }
            }
        }

        tracing::info!(
            project = %project.title,
            items = items.len(),
            skipped = skipped.len(),
            "provisioned project"
        );
        Ok(ProvisionReport {
            owner,
            project,
            created_project,
            items,
            skipped,
        })
    }
}
