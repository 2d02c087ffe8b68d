//! Google Drive v3 client over ureq.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use ureq::Agent;

use super::http::{self, bearer, endpoint, read_json};
use super::{ChildPage, MimeFilter, RemoteFile, RemoteStore};
use crate::error::RemoteError;

const SERVICE: &str = "drive";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, createdTime)";
const PAGE_SIZE: &str = "1000";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    created_time: DateTime<Utc>,
}

#[derive(Deserialize)]
struct FileId {
    id: String,
}

/// Drive client authenticated with an OAuth access token.
pub struct DriveClient {
    agent: Agent,
    token: String,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            agent: http::agent(http::DEFAULT_TIMEOUT),
            token: token.into(),
        }
    }

    fn query_for(parent_id: &str, filter: MimeFilter) -> String {
        let op = match filter {
            MimeFilter::FoldersOnly => "=",
            MimeFilter::NonFolders => "!=",
        };
        format!("'{parent_id}' in parents and mimeType {op} '{FOLDER_MIME}' and trashed = false")
    }
}

impl RemoteStore for DriveClient {
    fn list_children(
        &self,
        parent_id: &str,
        filter: MimeFilter,
        page_token: Option<&str>,
    ) -> Result<ChildPage, RemoteError> {
        let mut req = self
            .agent
            .get(FILES_URL)
            .header("Authorization", bearer(&self.token))
            .query("q", Self::query_for(parent_id, filter))
            .query("fields", LIST_FIELDS)
            .query("pageSize", PAGE_SIZE);
        if let Some(token) = page_token {
            req = req.query("pageToken", token);
        }
        let list: FileList = read_json(SERVICE, req.call()?)?;
        Ok(ChildPage {
            files: list
                .files
                .into_iter()
                .map(|f| RemoteFile {
                    id: f.id,
                    name: f.name,
                    created_at: f.created_time,
                })
                .collect(),
            next_page_token: list.next_page_token,
        })
    }

    fn copy_file(
        &self,
        template_id: &str,
        dest_folder_id: &str,
        new_name: &str,
    ) -> Result<String, RemoteError> {
        let url = endpoint(FILES_URL, &[template_id, "copy"])?;
        let resp = self
            .agent
            .post(url.as_str())
            .header("Authorization", bearer(&self.token))
            .send_json(json!({ "name": new_name, "parents": [dest_folder_id] }))?;
        let created: FileId = read_json(SERVICE, resp)?;
        Ok(created.id)
    }

    fn move_file(
        &self,
        file_id: &str,
        from_parent: &str,
        to_parent: &str,
    ) -> Result<bool, RemoteError> {
        let url = endpoint(FILES_URL, &[file_id])?;
        let resp = self
            .agent
            .patch(url.as_str())
            .header("Authorization", bearer(&self.token))
            .query("addParents", to_parent)
            .query("removeParents", from_parent)
            .send_json(json!({}))?;
        http::check_status(SERVICE, resp)?;
        Ok(true)
    }

    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, RemoteError> {
        let resp = self
            .agent
            .post(FILES_URL)
            .header("Authorization", bearer(&self.token))
            .send_json(json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent_id],
            }))?;
        let created: FileId = read_json(SERVICE, resp)?;
        Ok(created.id)
    }
}
