use std::collections::HashSet;

use chrono::Utc;

use crate::attachments::model::{
    link_name, to_data_url, validate_url, Attachment, AttachmentPolicy, AttachmentSource,
    FileUpload,
};
use crate::error::StoreError;
use crate::tasks::model::Task;

/// Working set of a single add/edit interaction. Nothing here touches the
/// store until the enclosing task save commits the plan; dropping the
/// session discards every staged entry.
#[derive(Debug, Default)]
pub struct EditSession {
    editing: Option<String>,
    staged: Vec<StagedAttachment>,
}

#[derive(Debug, Clone)]
pub enum StagedAttachment {
    /// Already persisted on the task being edited.
    Persisted(Attachment),
    /// New file accepted by the policy, not yet uploaded or encoded.
    File(StagedFile),
    /// New external link.
    Link(StagedLink),
}

#[derive(Debug, Clone)]
pub struct StagedFile {
    pub id: String,
    pub upload: FileUpload,
}

#[derive(Debug, Clone)]
pub struct StagedLink {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl StagedAttachment {
    pub fn id(&self) -> &str {
        match self {
            StagedAttachment::Persisted(a) => &a.id,
            StagedAttachment::File(f) => &f.id,
            StagedAttachment::Link(l) => &l.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StagedAttachment::Persisted(a) => &a.name,
            StagedAttachment::File(f) => &f.upload.name,
            StagedAttachment::Link(l) => &l.name,
        }
    }
}

/// What a task save has to do to make the persisted attachment set equal
/// the staged one.
#[derive(Debug, Default)]
pub struct CommitPlan {
    /// Persisted attachments still in the working set.
    pub keep: Vec<Attachment>,
    /// Persisted attachments dropped from the working set.
    pub remove: Vec<Attachment>,
    /// New files to upload or embed.
    pub files: Vec<StagedFile>,
    /// New external links to insert.
    pub links: Vec<StagedLink>,
}

impl EditSession {
    /// Fresh session for the add flow.
    pub fn for_new() -> Self {
        Self::default()
    }

    /// Session for editing `task`, seeded with its persisted attachments.
    pub fn for_task(task: &Task) -> Self {
        Self {
            editing: Some(task.id.clone()),
            staged: task
                .attachments
                .iter()
                .cloned()
                .map(StagedAttachment::Persisted)
                .collect(),
        }
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn staged(&self) -> &[StagedAttachment] {
        &self.staged
    }

    /// Validate and stage a file, returning its working-set id. A rejected
    /// file never enters the set.
    pub fn stage_file(
        &mut self,
        policy: &AttachmentPolicy,
        upload: FileUpload,
    ) -> Result<String, StoreError> {
        policy.check(&upload)?;
        let staged = StagedFile {
            id: uuid::Uuid::new_v4().to_string(),
            upload,
        };
        let id = staged.id.clone();
        self.staged.push(StagedAttachment::File(staged));
        Ok(id)
    }

    /// Validate and stage an external link, returning its working-set id.
    pub fn stage_link(&mut self, url: &str, label: Option<&str>) -> Result<String, StoreError> {
        validate_url(url)?;
        let staged = StagedLink {
            id: uuid::Uuid::new_v4().to_string(),
            name: link_name(url, label),
            url: url.to_string(),
        };
        let id = staged.id.clone();
        self.staged.push(StagedAttachment::Link(staged));
        Ok(id)
    }

    /// Drop an entry from the working set. No persistence side effect; a
    /// persisted attachment is only deleted when the save commits.
    pub fn remove(&mut self, attachment_id: &str) -> bool {
        let before = self.staged.len();
        self.staged.retain(|a| a.id() != attachment_id);
        self.staged.len() != before
    }

    /// Discard the working set. The persisted record is untouched.
    pub fn cancel(self) {}

    /// Split the working set into a commit plan relative to the currently
    /// persisted attachments. Borrows the session: a failed save leaves
    /// the staged entries intact for retry.
    pub fn plan(&self, persisted: &[Attachment]) -> CommitPlan {
        let mut plan = CommitPlan::default();
        let mut kept_ids = HashSet::new();
        for staged in &self.staged {
            match staged {
                StagedAttachment::Persisted(a) => {
                    kept_ids.insert(a.id.clone());
                    plan.keep.push(a.clone());
                }
                StagedAttachment::File(f) => plan.files.push(f.clone()),
                StagedAttachment::Link(l) => plan.links.push(l.clone()),
            }
        }
        plan.remove = persisted
            .iter()
            .filter(|a| !kept_ids.contains(&a.id))
            .cloned()
            .collect();
        plan
    }
}

/// Materialize a commit plan for the embedded (local) shape: kept entries
/// survive, files become self-contained data URLs, links become link
/// records. Removed entries simply fall out of the replaced list.
pub fn materialize_embedded(plan: CommitPlan) -> Vec<Attachment> {
    let mut attachments = plan.keep;
    for file in plan.files {
        let FileUpload { name, mime, bytes } = file.upload;
        let data_url = to_data_url(&mime, &bytes);
        attachments.push(Attachment {
            id: file.id,
            name,
            mime,
            created_at: Utc::now(),
            source: AttachmentSource::Embedded { data_url },
        });
    }
    for link in plan.links {
        attachments.push(Attachment {
            id: link.id,
            name: link.name,
            mime: "link".to_string(),
            created_at: Utc::now(),
            source: AttachmentSource::Link { url: link.url },
        });
    }
    attachments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::CreateTaskPayload;

    fn policy() -> AttachmentPolicy {
        AttachmentPolicy {
            max_bytes: 64,
            allowed_mime: None,
        }
    }

    fn upload(name: &str, size: usize) -> FileUpload {
        FileUpload {
            name: name.to_string(),
            mime: "image/png".to_string(),
            bytes: vec![0u8; size],
        }
    }

    fn persisted(id: &str) -> Attachment {
        Attachment {
            id: id.to_string(),
            name: format!("{}.png", id),
            mime: "image/png".to_string(),
            created_at: Utc::now(),
            source: AttachmentSource::Embedded {
                data_url: "data:image/png;base64,AA==".to_string(),
            },
        }
    }

    #[test]
    fn oversized_file_never_enters_the_working_set() {
        let mut session = EditSession::for_new();
        let err = session.stage_file(&policy(), upload("huge.png", 65)).unwrap_err();
        assert!(matches!(err, StoreError::FileTooLarge { .. }));
        assert!(session.staged().is_empty());
    }

    #[test]
    fn invalid_link_never_enters_the_working_set() {
        let mut session = EditSession::for_new();
        assert!(session.stage_link("not a url", None).is_err());
        assert!(session.staged().is_empty());
    }

    #[test]
    fn remove_before_save_has_no_persistence_side_effect() {
        let mut session = EditSession::for_new();
        let id = session.stage_file(&policy(), upload("a.png", 10)).unwrap();
        session.stage_link("https://example.com", Some("notes")).unwrap();
        assert_eq!(session.staged().len(), 2);

        assert!(session.remove(&id));
        assert!(!session.remove(&id));
        assert_eq!(session.staged().len(), 1);
        assert_eq!(session.staged()[0].name(), "notes");
    }

    #[test]
    fn plan_diffs_staged_against_persisted() {
        let task = {
            let mut t = CreateTaskPayload {
                title: "t".into(),
                ..Default::default()
            }
            .into_task(Utc::now())
            .unwrap();
            t.attachments = vec![persisted("a1"), persisted("a2")];
            t
        };

        let mut session = EditSession::for_task(&task);
        assert_eq!(session.editing(), Some(task.id.as_str()));
        assert_eq!(session.staged().len(), 2);

        session.remove("a2");
        session.stage_file(&policy(), upload("new.png", 10)).unwrap();

        let plan = session.plan(&task.attachments);
        assert_eq!(plan.keep.len(), 1);
        assert_eq!(plan.keep[0].id, "a1");
        assert_eq!(plan.remove.len(), 1);
        assert_eq!(plan.remove[0].id, "a2");
        assert_eq!(plan.files.len(), 1);
        assert!(plan.links.is_empty());
    }

    #[test]
    fn materialize_embeds_files_as_data_urls() {
        let mut session = EditSession::for_new();
        session.stage_file(&policy(), upload("a.png", 3)).unwrap();
        session.stage_link("https://example.com/doc", None).unwrap();

        let attachments = materialize_embedded(session.plan(&[]));
        assert_eq!(attachments.len(), 2);
        assert!(matches!(
            &attachments[0].source,
            AttachmentSource::Embedded { data_url } if data_url.starts_with("data:image/png;base64,")
        ));
        assert!(attachments[1].external());
        assert_eq!(attachments[1].name, "example.com/doc");
    }
}
