use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};

use super::model::{
    link_name, storage_path, validate_url, Attachment, AttachmentPolicy, AttachmentSource,
    FileUpload,
};
use crate::error::StoreError;
use crate::session::CommitPlan;

fn task_pk(task_id: &str) -> String {
    format!("TASK#{}", task_id)
}

fn attachment_sk(attachment_id: &str) -> String {
    format!("ATT#{}", attachment_id)
}

/// Public retrieval URL for an object, in the bucket-hosted form.
fn object_url(bucket_name: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket_name, key)
}

/// Map a DynamoDB item back into an `Attachment`, rejecting records whose
/// stored shape no longer satisfies the one-payload invariant.
pub(crate) fn attachment_from_item(
    attachment_id: &str,
    item: &HashMap<String, AttributeValue>,
) -> Result<Attachment, StoreError> {
    let get_s = |key: &str| {
        item.get(key)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
    };

    let external = item
        .get("external")
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false);

    let source = match (external, get_s("url"), get_s("storage_path"), get_s("data_url")) {
        (true, Some(url), None, None) => AttachmentSource::Link { url },
        (false, Some(url), Some(storage_path), None) => AttachmentSource::Stored { url, storage_path },
        (false, None, None, Some(data_url)) => AttachmentSource::Embedded { data_url },
        _ => {
            return Err(StoreError::Storage(format!(
                "attachment {} has an inconsistent payload",
                attachment_id
            )))
        }
    };

    let created_at = get_s("created_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Ok(Attachment {
        id: attachment_id.to_string(),
        name: get_s("name").unwrap_or_default(),
        mime: get_s("mime").unwrap_or_default(),
        created_at,
        source,
    })
}

/// All attachments persisted under a task, oldest first.
pub async fn list_attachments(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
) -> Result<Vec<Attachment>, StoreError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(task_pk(task_id)))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("ATT#".to_string()))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB query error: {}", e)))?;

    let mut attachments = Vec::new();
    for item in result.items() {
        if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
            if let Some(attachment_id) = sk.strip_prefix("ATT#") {
                attachments.push(attachment_from_item(attachment_id, item)?);
            }
        }
    }
    attachments.sort_by_key(|a| a.created_at);
    Ok(attachments)
}

async fn put_attachment(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    attachment: &Attachment,
) -> Result<(), StoreError> {
    let mut builder = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(task_pk(task_id)))
        .item("SK", AttributeValue::S(attachment_sk(&attachment.id)))
        .item("name", AttributeValue::S(attachment.name.clone()))
        .item("mime", AttributeValue::S(attachment.mime.clone()))
        .item("external", AttributeValue::Bool(attachment.external()))
        .item(
            "created_at",
            AttributeValue::S(attachment.created_at.to_rfc3339()),
        );

    builder = match &attachment.source {
        AttachmentSource::Embedded { data_url } => {
            builder.item("data_url", AttributeValue::S(data_url.clone()))
        }
        AttachmentSource::Stored { url, storage_path } => builder
            .item("url", AttributeValue::S(url.clone()))
            .item("storage_path", AttributeValue::S(storage_path.clone())),
        AttachmentSource::Link { url } => builder.item("url", AttributeValue::S(url.clone())),
    };

    builder
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB put_item error: {}", e)))?;
    Ok(())
}

/// Upload a file to the blob store and persist its attachment record under
/// the task. The task must already exist so the object key can nest under
/// its id.
pub async fn upload_file(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket_name: &str,
    task_id: &str,
    policy: &AttachmentPolicy,
    upload: FileUpload,
) -> Result<Attachment, StoreError> {
    policy.check(&upload)?;
    let FileUpload { name, mime, bytes } = upload;

    let now = Utc::now();
    let path = storage_path(task_id, now, &name);
    s3.put_object()
        .bucket(bucket_name)
        .key(&path)
        .content_type(&mime)
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("S3 put_object error: {}", e)))?;

    let attachment = Attachment {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        mime,
        created_at: now,
        source: AttachmentSource::Stored {
            url: object_url(bucket_name, &path),
            storage_path: path,
        },
    };
    put_attachment(dynamo, table_name, task_id, &attachment).await?;
    Ok(attachment)
}

/// Persist an external link attachment. No blob is written.
pub async fn add_link(
    dynamo: &DynamoClient,
    table_name: &str,
    task_id: &str,
    url: &str,
    label: Option<&str>,
) -> Result<Attachment, StoreError> {
    validate_url(url)?;
    let attachment = Attachment {
        id: uuid::Uuid::new_v4().to_string(),
        name: link_name(url, label),
        mime: "link".to_string(),
        created_at: Utc::now(),
        source: AttachmentSource::Link {
            url: url.to_string(),
        },
    };
    put_attachment(dynamo, table_name, task_id, &attachment).await?;
    Ok(attachment)
}

/// Remove one attachment. A failed blob delete is logged and swallowed so a
/// missing object never blocks the record delete.
pub async fn delete_attachment(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket_name: &str,
    task_id: &str,
    attachment: &Attachment,
) -> Result<(), StoreError> {
    if let AttachmentSource::Stored { storage_path, .. } = &attachment.source {
        if let Err(e) = s3
            .delete_object()
            .bucket(bucket_name)
            .key(storage_path)
            .send()
            .await
        {
            tracing::warn!("S3 delete_object failed for {}: {}", storage_path, e);
        }
    }

    dynamo
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(task_pk(task_id)))
        .key("SK", AttributeValue::S(attachment_sk(&attachment.id)))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB delete_item error: {}", e)))?;
    Ok(())
}

/// Execute a commit plan against the remote store: removed attachments are
/// cascade-deleted, new files uploaded, new links inserted. A failed upload
/// propagates so the caller keeps its working set for retry.
pub async fn commit_plan(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket_name: &str,
    task_id: &str,
    policy: &AttachmentPolicy,
    plan: CommitPlan,
) -> Result<Vec<Attachment>, StoreError> {
    let removals = plan
        .remove
        .iter()
        .map(|a| delete_attachment(dynamo, s3, table_name, bucket_name, task_id, a));
    futures::future::try_join_all(removals).await?;

    let mut attachments = plan.keep;
    for file in plan.files {
        attachments
            .push(upload_file(dynamo, s3, table_name, bucket_name, task_id, policy, file.upload).await?);
    }
    for link in plan.links {
        let attachment = Attachment {
            id: link.id,
            name: link.name,
            mime: "link".to_string(),
            created_at: Utc::now(),
            source: AttachmentSource::Link { url: link.url },
        };
        put_attachment(dynamo, table_name, task_id, &attachment).await?;
        attachments.push(attachment);
    }
    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, AttributeValue)]) -> HashMap<String, AttributeValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn stored_item_maps_back_to_a_stored_source() {
        let attachment = attachment_from_item(
            "a1",
            &item(&[
                ("name", AttributeValue::S("mockup.png".into())),
                ("mime", AttributeValue::S("image/png".into())),
                ("external", AttributeValue::Bool(false)),
                ("url", AttributeValue::S("https://b.s3.amazonaws.com/k".into())),
                ("storage_path", AttributeValue::S("tasks/t1/1-mockup.png".into())),
                ("created_at", AttributeValue::S("2026-01-02T03:04:05+00:00".into())),
            ]),
        )
        .unwrap();

        assert_eq!(attachment.id, "a1");
        assert!(!attachment.external());
        assert_eq!(
            attachment.source,
            AttachmentSource::Stored {
                url: "https://b.s3.amazonaws.com/k".into(),
                storage_path: "tasks/t1/1-mockup.png".into(),
            }
        );
    }

    #[test]
    fn link_item_maps_back_to_a_link() {
        let attachment = attachment_from_item(
            "a2",
            &item(&[
                ("name", AttributeValue::S("design notes".into())),
                ("mime", AttributeValue::S("link".into())),
                ("external", AttributeValue::Bool(true)),
                ("url", AttributeValue::S("https://example.com/notes".into())),
            ]),
        )
        .unwrap();

        assert!(attachment.external());
        assert_eq!(attachment.url(), Some("https://example.com/notes"));
    }

    #[test]
    fn inconsistent_payload_is_a_storage_failure() {
        // external link that also claims a blob path
        let err = attachment_from_item(
            "a3",
            &item(&[
                ("external", AttributeValue::Bool(true)),
                ("url", AttributeValue::S("https://example.com".into())),
                ("storage_path", AttributeValue::S("tasks/t1/x".into())),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));

        // no payload at all
        let err = attachment_from_item(
            "a4",
            &item(&[("external", AttributeValue::Bool(false))]),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
