//! Turning a submitted mentorship issue into a project item.

use mentorship_ingest::{
    ingest, is_mentorship_issue, render_processing_comment, ExtractionSchema, IngestError,
    NormalizeContext, Origin, PairRecord, ScanOptions,
};
use serde::Deserialize;
use serde_json::json;

use crate::envelope::decode;
use crate::{
    GraphqlRequest, GraphqlTransport, IdentityResolution, Lookup, Project, ProvisionMode,
    ProvisionedItem, Provisioner, RemoteError, ResolveError,
};

const ISSUE_QUERY: &str = "query MentorshipIssue($owner: String!, $repo: String!, $number: Int!) { \
    repository(owner: $owner, name: $repo) { \
    issue(number: $number) { id number title body url } } }";

const ADD_COMMENT: &str = "mutation CommentOnIssue($subjectId: ID!, $body: String!) { \
    addComment(input: {subjectId: $subjectId, body: $body}) { commentEdge { node { id } } } }";

const CLOSE_ISSUE: &str = "mutation CloseIssue($issueId: ID!) { \
    closeIssue(input: {issueId: $issueId}) { issue { id state } } }";

pub const DEFAULT_PROJECT_TITLE: &str = "Mentorship Program";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Owner(#[from] ResolveError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("issue {owner}/{repo}#{number} not found")]
    NotFound {
        owner: String,
        repo: String,
        number: u64,
    },
    #[error("issue #{number} is not a mentorship request: `{title}`")]
    NotMentorship { number: u64, title: String },
    #[error("issue #{number} does not describe a valid pair: {}", .warnings.join(", "))]
    InvalidRecord { number: u64, warnings: Vec<String> },
}

/// What happened to one issue. The follow-ups run after the item exists and
/// report their own outcome.
#[derive(Debug)]
pub struct IssueOutcome {
    pub issue: Issue,
    pub record: PairRecord,
    pub owner: IdentityResolution,
    pub project: Project,
    pub created_project: bool,
    pub item: ProvisionedItem,
    pub comment: Result<(), RemoteError>,
    pub close: Result<(), RemoteError>,
}

pub struct IssueProcessor<T> {
    provisioner: Provisioner<T>,
    schema: ExtractionSchema,
    options: ScanOptions,
    context: NormalizeContext,
    project_title: String,
}

impl<T: GraphqlTransport> IssueProcessor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            provisioner: Provisioner::new(transport),
            schema: ExtractionSchema::default(),
            options: ScanOptions::default(),
            context: NormalizeContext::issue(),
            project_title: DEFAULT_PROJECT_TITLE.to_string(),
        }
    }

    pub fn with_project_title(mut self, title: impl Into<String>) -> Self {
        self.project_title = title.into();
        self
    }

    pub fn with_context(mut self, context: NormalizeContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_schema(mut self, schema: ExtractionSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn fetch_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, IssueError> {
        let not_found = || IssueError::NotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        };
        let request = GraphqlRequest::new(
            ISSUE_QUERY,
            json!({ "owner": owner, "repo": repo, "number": number }),
        );
        let envelope = self.provisioner.transport().execute(&request)?;
        let repository = match envelope.lookup("repository")? {
            Lookup::Found(repository) => repository,
            Lookup::Absent(_) => return Err(not_found()),
        };
        match repository.get("issue").filter(|v| !v.is_null()) {
            Some(issue) => Ok(decode(issue.clone(), "issue")?),
            None => Err(not_found()),
        }
    }

    fn run_mutation(
        &self,
        query: &'static str,
        variables: serde_json::Value,
        field: &str,
    ) -> Result<(), RemoteError> {
        self.provisioner
            .transport()
            .execute(&GraphqlRequest::new(query, variables))?
            .require(field)
            .map(|_| ())
    }

    pub fn process(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<IssueOutcome, IssueError> {
        let issue = self.fetch_issue(owner, repo, number)?;
        if !is_mentorship_issue(&issue.title) {
            return Err(IssueError::NotMentorship {
                number,
                title: issue.title,
            });
        }

        let normalized = ingest(
            Origin::Issue {
                number,
                text: issue.body.clone().unwrap_or_default(),
            },
            &self.schema,
            &self.options,
            &self.context,
        )?;
        if !normalized.valid {
            return Err(IssueError::InvalidRecord {
                number,
                warnings: normalized.warnings,
            });
        }
        let record = normalized.record;

        let resolved = self.provisioner.resolver().resolve(owner)?;
        let (project, created_project) = self.provisioner.ensure_project(
            &resolved.id,
            &self.project_title,
            ProvisionMode::ReuseExisting,
        )?;
        let item = self.provisioner.add_item(&project.id, &record)?;

        let body = render_processing_comment(&record, project.url.as_deref());
        let comment = self.run_mutation(
            ADD_COMMENT,
            json!({ "subjectId": issue.id, "body": body }),
            "addComment",
        );
        if let Err(err) = &comment {
            tracing::warn!(issue = number, error = %err, "could not comment on issue");
        }
        let close = self.run_mutation(CLOSE_ISSUE, json!({ "issueId": issue.id }), "closeIssue");
        if let Err(err) = &close {
            tracing::warn!(issue = number, error = %err, "could not close issue");
        }

        tracing::info!(
            issue = number,
            mentor = %record.mentor(),
            mentee = %record.mentee(),
            project = %project.title,
            "processed mentorship issue"
        );
        Ok(IssueOutcome {
            issue,
            record,
            owner: resolved,
            project,
            created_project,
            item,
            comment,
            close,
        })
    }
}
