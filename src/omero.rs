use std::collections::BTreeSet;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{
    DescriptorBody, Group, ImageInfo, ObjectDescriptor, ObjectKind, ObjectRef, Owner,
    WellPosition,
};
use crate::error::BrowseError;
use crate::repository::{Credentials, Repository, SessionHandle, Tag};
use crate::uri::parse_server_uri;

const PAGE_SIZE: usize = 500;
const MAP_NAMESPACE: &str = "openmicroscopy.org/omero/client/mapAnnotation";

#[derive(Debug, Default)]
struct Connection {
    base: Option<String>,
    csrf: Option<String>,
}

pub struct OmeroHttpClient {
    client: Client,
    connection: Mutex<Connection>,
}

impl OmeroHttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, BrowseError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("omero-browse/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BrowseError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| BrowseError::Http(err.to_string()))?;
        Ok(Self {
            client,
            connection: Mutex::new(Connection::default()),
        })
    }

    fn base(&self) -> Result<String, BrowseError> {
        self.connection
            .lock()
            .ok()
            .and_then(|connection| connection.base.clone())
            .ok_or(BrowseError::NotLoggedIn)
    }

    fn csrf(&self) -> Option<String> {
        self.connection
            .lock()
            .ok()
            .and_then(|connection| connection.csrf.clone())
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<Response, BrowseError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    if err.is_connect() {
                        return Err(BrowseError::Unreachable(err.to_string()));
                    }
                    return Err(BrowseError::Http(err.to_string()));
                }
            }
        }
    }

    fn handle_status(response: Response, target: &str) -> Result<Response, BrowseError> {
        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response),
            401 => Err(BrowseError::NotLoggedIn),
            403 | 404 => Err(BrowseError::AccessDenied(target.to_string())),
            _ => {
                let message = response
                    .text()
                    .unwrap_or_else(|_| "OMERO request failed".to_string());
                Err(BrowseError::Status { status, message })
            }
        }
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, BrowseError> {
        let url = format!("{}{path}", self.base()?);
        debug!(%url, "GET");
        let response = self.send_with_retries(|| self.client.get(&url).query(query))?;
        Self::handle_status(response, path)?
            .json()
            .map_err(|err| BrowseError::MalformedResponse(err.to_string()))
    }

    fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<Response, BrowseError> {
        let base = self.base()?;
        let url = format!("{base}{path}");
        let csrf = self.csrf().unwrap_or_default();
        debug!(%url, "POST");
        let response = self.send_with_retries(|| {
            self.client
                .post(&url)
                .header("X-CSRFToken", csrf.as_str())
                .header(REFERER, base.as_str())
                .form(form)
        })?;
        Self::handle_status(response, path)
    }

    fn get_all(&self, path: &str, scope: &[(&str, String)]) -> Result<Vec<Value>, BrowseError> {
        let mut items = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut query = scope.to_vec();
            query.push(("limit", PAGE_SIZE.to_string()));
            query.push(("offset", offset.to_string()));
            let body = self.get_json(path, &query)?;
            let page = body
                .get("data")
                .and_then(|value| value.as_array())
                .cloned()
                .unwrap_or_default();
            let count = page.len();
            items.extend(page);
            if count < PAGE_SIZE {
                break;
            }
            offset += count;
        }
        Ok(items)
    }

    fn descriptors(
        &self,
        path: &str,
        group: &Group,
        owner: &Owner,
        extra: &[(&'static str, String)],
    ) -> Result<Vec<ObjectDescriptor>, BrowseError> {
        let mut scope = scope_query(group, owner);
        scope.extend_from_slice(extra);
        Ok(self
            .get_all(path, &scope)?
            .iter()
            .filter_map(parse_descriptor)
            .collect())
    }

    fn map_annotations(&self, object: ObjectRef) -> Result<Vec<MapAnnotation>, BrowseError> {
        let body = self.get_json(
            "/webclient/api/annotations/",
            &[("type", "map".to_string()), (object.kind.as_str(), object.id.to_string())],
        )?;
        Ok(parse_map_annotations(&body))
    }

    fn save_map_annotation(
        &self,
        object: ObjectRef,
        annotation_id: Option<i64>,
        pairs: &[(String, String)],
    ) -> Result<(), BrowseError> {
        let values = pairs
            .iter()
            .map(|(key, value)| json!([key, value]))
            .collect::<Vec<_>>();
        let mut form = vec![
            (object.kind.as_str(), object.id.to_string()),
            ("mapAnnotation", Value::Array(values).to_string()),
            ("ns", MAP_NAMESPACE.to_string()),
        ];
        if let Some(id) = annotation_id {
            form.push(("annId", id.to_string()));
        }
        self.post_form("/webclient/annotate_map/", &form)?;
        Ok(())
    }

    fn group_names(&self, user_id: i64) -> Result<Vec<Group>, BrowseError> {
        let path = format!("/api/v0/m/experimenters/{user_id}/experimentergroups/");
        Ok(self
            .get_all(&path, &[])?
            .iter()
            .filter_map(parse_group)
            .collect())
    }
}

impl Repository for OmeroHttpClient {
    fn login(&self, credentials: &Credentials) -> Result<SessionHandle, BrowseError> {
        let base = parse_server_uri(&credentials.server)
            .map_err(|_| BrowseError::BadUrl(credentials.server.clone()))?;
        if let Ok(mut connection) = self.connection.lock() {
            connection.base = Some(base.clone());
        }

        let token = self
            .get_json("/api/v0/token/", &[])
            .map_err(|err| login_request_error(&base, err))?;
        let csrf = token
            .get("data")
            .and_then(|value| value.as_str())
            .ok_or_else(|| BrowseError::BadUrl(format!("{base}: no CSRF token")))?
            .to_string();
        if let Ok(mut connection) = self.connection.lock() {
            connection.csrf = Some(csrf.clone());
        }

        let servers = self
            .get_json("/api/v0/servers/", &[])
            .map_err(|err| login_request_error(&base, err))?;
        let server_id = servers
            .get("data")
            .and_then(|value| value.as_array())
            .and_then(|array| array.first())
            .and_then(|value| value.get("id"))
            .and_then(|value| value.as_i64())
            .unwrap_or(1);

        let url = format!("{base}/api/v0/login/");
        let form = [
            ("server", server_id.to_string()),
            ("username", credentials.username.clone()),
            ("password", credentials.password.clone()),
        ];
        let response = self.send_with_retries(|| {
            self.client
                .post(&url)
                .header("X-CSRFToken", csrf.as_str())
                .header(REFERER, base.as_str())
                .form(&form)
        })
        .map_err(|err| login_request_error(&base, err))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|err| login_request_error(&base, BrowseError::Http(err.to_string())))?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);
        if !(200..300).contains(&status) || body.get("success") != Some(&Value::Bool(true)) {
            let message = body
                .get("message")
                .and_then(|value| value.as_str())
                .unwrap_or("login rejected")
                .to_string();
            return Err(login_error(status, message));
        }

        let context = parse_event_context(&body, &base)?;
        let groups = self
            .group_names(context.user.id)
            .unwrap_or_else(|_| context.groups.clone());
        let default_group = groups
            .iter()
            .find(|group| group.id == context.default_group.id)
            .cloned()
            .unwrap_or(context.default_group);
        Ok(SessionHandle {
            groups,
            default_group,
            ..context
        })
    }

    fn switch_group(&self, _handle: &SessionHandle, group_id: i64) -> Result<(), BrowseError> {
        self.get_json_or_empty(
            "/webclient/active_group/",
            &[("active_group", group_id.to_string())],
        )
    }

    fn logout(&self, _handle: &SessionHandle) -> Result<(), BrowseError> {
        self.post_form("/webclient/logout/", &[])?;
        if let Ok(mut connection) = self.connection.lock() {
            *connection = Connection::default();
        }
        Ok(())
    }

    fn ping(&self, _handle: &SessionHandle) -> Result<(), BrowseError> {
        self.get_json_or_empty("/webclient/keepalive_ping/", &[])
    }

    fn fetch_children(
        &self,
        parent: ObjectRef,
        group: &Group,
        owner: &Owner,
    ) -> Result<Vec<ObjectDescriptor>, BrowseError> {
        let child_count = [("childCount", "true".to_string())];
        match parent.kind {
            ObjectKind::Server => {
                let mut children =
                    self.descriptors("/api/v0/m/projects/", group, owner, &child_count)?;
                children.extend(self.descriptors(
                    "/api/v0/m/screens/",
                    group,
                    owner,
                    &child_count,
                )?);
                Ok(children)
            }
            ObjectKind::Project => self.descriptors(
                &format!("/api/v0/m/projects/{}/datasets/", parent.id),
                group,
                owner,
                &child_count,
            ),
            ObjectKind::Dataset => self.descriptors(
                &format!("/api/v0/m/datasets/{}/images/", parent.id),
                group,
                owner,
                &[],
            ),
            ObjectKind::Screen => self.descriptors(
                &format!("/api/v0/m/screens/{}/plates/", parent.id),
                group,
                owner,
                &child_count,
            ),
            ObjectKind::Plate => self.descriptors(
                &format!("/api/v0/m/plates/{}/wells/", parent.id),
                group,
                owner,
                &[],
            ),
            ObjectKind::Well => {
                let body = self.get_json(&format!("/api/v0/m/wells/{}/", parent.id), &[])?;
                Ok(body
                    .get("data")
                    .map(parse_well_images)
                    .unwrap_or_default())
            }
            ObjectKind::Image | ObjectKind::OrphanedFolder => Ok(Vec::new()),
        }
    }

    fn fetch_orphaned_images(
        &self,
        group: &Group,
        owner: &Owner,
    ) -> Result<Vec<ObjectDescriptor>, BrowseError> {
        self.descriptors(
            "/api/v0/m/images/",
            group,
            owner,
            &[("orphaned", "true".to_string())],
        )
    }

    fn list_owners(&self, group: &Group) -> Result<Vec<Owner>, BrowseError> {
        let path = if group.is_all_groups() {
            "/api/v0/m/experimenters/".to_string()
        } else {
            format!("/api/v0/m/experimentergroups/{}/experimenters/", group.id)
        };
        Ok(self
            .get_all(&path, &[])?
            .iter()
            .filter_map(parse_owner)
            .collect())
    }

    fn read_tags(&self, object: ObjectRef) -> Result<Vec<Tag>, BrowseError> {
        let body = self.get_json(
            "/webclient/api/annotations/",
            &[("type", "tag".to_string()), (object.kind.as_str(), object.id.to_string())],
        )?;
        Ok(parse_tags(&body))
    }

    fn read_key_values(&self, object: ObjectRef) -> Result<Vec<(String, String)>, BrowseError> {
        Ok(self
            .map_annotations(object)?
            .into_iter()
            .flat_map(|annotation| annotation.values)
            .collect())
    }

    fn find_or_create_tag(&self, name: &str) -> Result<i64, BrowseError> {
        let existing = self.get_json("/webclient/api/tags/", &[])?;
        if let Some(id) = find_tag_id(&existing, name) {
            return Ok(id);
        }
        let response = self.post_form(
            "/webclient/action/addnewcontainer/",
            &[("folder_type", "tag".to_string()), ("name", name.to_string())],
        )?;
        let body: Value = response
            .json()
            .map_err(|err| BrowseError::MalformedResponse(err.to_string()))?;
        body.get("id")
            .and_then(|value| value.as_i64())
            .ok_or_else(|| BrowseError::MalformedResponse(format!("no id for new tag {name}")))
    }

    fn link_tag(&self, object: ObjectRef, tag_id: i64) -> Result<(), BrowseError> {
        self.post_form(
            "/webclient/annotate_tags/",
            &[
                (object.kind.as_str(), object.id.to_string()),
                ("tags", tag_id.to_string()),
            ],
        )?;
        Ok(())
    }

    fn unlink_tag(&self, object: ObjectRef, tag_id: i64) -> Result<(), BrowseError> {
        self.post_form(
            &format!("/webclient/action/remove/tag/{tag_id}/"),
            &[("parent", object.to_string())],
        )?;
        Ok(())
    }

    fn write_key_values(
        &self,
        object: ObjectRef,
        pairs: &[(String, String)],
    ) -> Result<(), BrowseError> {
        self.save_map_annotation(object, None, pairs)
    }

    fn delete_key_values(&self, object: ObjectRef, keys: &[String]) -> Result<(), BrowseError> {
        let keys = keys.iter().map(String::as_str).collect::<BTreeSet<_>>();
        for annotation in self.map_annotations(object)? {
            let remaining = annotation
                .values
                .iter()
                .filter(|(key, _)| !keys.contains(key.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            if remaining.len() != annotation.values.len() {
                self.save_map_annotation(object, Some(annotation.id), &remaining)?;
            }
        }
        Ok(())
    }

    fn fetch_thumbnail(&self, image_id: i64, size: u32) -> Result<Vec<u8>, BrowseError> {
        let path = format!("/webclient/render_thumbnail/size/{size}/{image_id}/");
        let url = format!("{}{path}", self.base()?);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let bytes = Self::handle_status(response, &path)?
            .bytes()
            .map_err(|err| BrowseError::Http(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl OmeroHttpClient {
    fn get_json_or_empty(&self, path: &str, query: &[(&str, String)]) -> Result<(), BrowseError> {
        let url = format!("{}{path}", self.base()?);
        let response = self.send_with_retries(|| self.client.get(&url).query(query))?;
        Self::handle_status(response, path)?;
        Ok(())
    }
}

fn scope_query(group: &Group, owner: &Owner) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if !group.is_all_groups() {
        query.push(("group", group.id.to_string()));
    }
    if !owner.is_all_members() {
        query.push(("owner", owner.id.to_string()));
    }
    query
}

fn login_request_error(base: &str, err: BrowseError) -> BrowseError {
    match err {
        BrowseError::Unreachable(_) | BrowseError::BadUrl(_) => err,
        BrowseError::NotLoggedIn => {
            BrowseError::BadCredentials(format!("{base} refused the session"))
        }
        other => BrowseError::BadUrl(format!("{base}: {other}")),
    }
}

fn login_error(status: u16, message: String) -> BrowseError {
    let lowered = message.to_lowercase();
    if lowered.contains("password") || lowered.contains("username") || status == 401 {
        BrowseError::BadCredentials(message)
    } else {
        BrowseError::NoAccess(message)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

pub fn parse_event_context(body: &Value, server_uri: &str) -> Result<SessionHandle, BrowseError> {
    let context = body
        .get("eventContext")
        .ok_or_else(|| BrowseError::MalformedResponse("missing eventContext".to_string()))?;
    let user_id = context
        .get("userId")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| BrowseError::MalformedResponse("missing userId".to_string()))?;
    let user_name = str_field(context, "userName").unwrap_or_default();
    let group_id = context
        .get("groupId")
        .and_then(|value| value.as_i64())
        .ok_or_else(|| BrowseError::MalformedResponse("missing groupId".to_string()))?;
    let default_group = Group::new(
        group_id,
        str_field(context, "groupName").unwrap_or_else(|| format!("group {group_id}")),
    );
    let mut groups = context
        .get("memberOfGroups")
        .and_then(|value| value.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_i64())
                .map(|id| Group::new(id, format!("group {id}")))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if let Some(group) = groups.iter_mut().find(|group| group.id == group_id) {
        *group = default_group.clone();
    } else {
        groups.push(default_group.clone());
    }

    Ok(SessionHandle {
        server_uri: server_uri.to_string(),
        user: Owner::new(user_id, user_name),
        default_group,
        groups,
        is_admin: context
            .get("isAdmin")
            .and_then(|value| value.as_bool())
            .unwrap_or(false),
    })
}

pub fn parse_descriptor(value: &Value) -> Option<ObjectDescriptor> {
    let id = value.get("@id")?.as_i64()?;
    let kind = ObjectKind::from_omero_type(value.get("@type")?.as_str()?)?;
    let details = value.get("omero:details");
    let owner = details
        .and_then(|details| details.get("owner"))
        .and_then(parse_owner)
        .unwrap_or_else(Owner::all_members);
    let group = details
        .and_then(|details| details.get("group"))
        .and_then(parse_group)
        .unwrap_or_else(Group::all_groups);
    let mut child_count = value
        .get("omero:childCount")
        .and_then(|value| value.as_u64())
        .map(saturating_u32);

    let body = match kind {
        ObjectKind::Project => DescriptorBody::Project,
        ObjectKind::Dataset => DescriptorBody::Dataset,
        ObjectKind::Screen => DescriptorBody::Screen,
        ObjectKind::Plate => DescriptorBody::Plate,
        ObjectKind::Well => {
            child_count = value
                .get("WellSamples")
                .and_then(|samples| samples.as_array())
                .map(|samples| u32::try_from(samples.len()).unwrap_or(u32::MAX))
                .or(child_count);
            DescriptorBody::Well(WellPosition {
                row: u32_field(value, "Row"),
                column: u32_field(value, "Column"),
            })
        }
        ObjectKind::Image => DescriptorBody::Image(parse_image_info(value)),
        ObjectKind::Server | ObjectKind::OrphanedFolder => return None,
    };
    let name = match &body {
        DescriptorBody::Well(position) => str_field(value, "Name")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| well_label(*position)),
        _ => str_field(value, "Name").unwrap_or_default(),
    };

    Some(ObjectDescriptor {
        id,
        name,
        description: str_field(value, "Description").filter(|text| !text.is_empty()),
        owner,
        group,
        child_count,
        body,
    })
}

pub fn parse_well_images(well: &Value) -> Vec<ObjectDescriptor> {
    well.get("WellSamples")
        .and_then(|samples| samples.as_array())
        .map(|samples| {
            samples
                .iter()
                .filter_map(|sample| sample.get("Image"))
                .filter_map(parse_descriptor)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_image_info(value: &Value) -> ImageInfo {
    let pixels = value.get("Pixels").unwrap_or(&Value::Null);
    ImageInfo {
        size_x: u32_field(pixels, "SizeX"),
        size_y: u32_field(pixels, "SizeY"),
        size_c: u32_field(pixels, "SizeC"),
        size_z: u32_field(pixels, "SizeZ"),
        size_t: u32_field(pixels, "SizeT"),
        physical_size_x: physical_size(pixels, "PhysicalSizeX"),
        physical_size_y: physical_size(pixels, "PhysicalSizeY"),
        physical_size_z: physical_size(pixels, "PhysicalSizeZ"),
        pixel_type: pixels
            .get("Type")
            .and_then(|kind| kind.get("value"))
            .and_then(|kind| kind.as_str())
            .unwrap_or_default()
            .to_string(),
        acquisition_date: value.get("AcquisitionDate").and_then(parse_timestamp),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(millis) => millis.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|date| date.with_timezone(&Utc)),
        _ => None,
    }
}

fn physical_size(pixels: &Value, field: &str) -> Option<f64> {
    pixels
        .get(field)
        .and_then(|size| size.get("Value"))
        .and_then(|size| size.as_f64())
}

fn parse_owner(value: &Value) -> Option<Owner> {
    let id = value.get("@id").or_else(|| value.get("id"))?.as_i64()?;
    let first = str_field(value, "FirstName").unwrap_or_default();
    let last = str_field(value, "LastName").unwrap_or_default();
    let full = format!("{first} {last}").trim().to_string();
    let name = if full.is_empty() {
        str_field(value, "UserName").unwrap_or_else(|| format!("user {id}"))
    } else {
        full
    };
    Some(Owner::new(id, name))
}

fn parse_group(value: &Value) -> Option<Group> {
    let id = value.get("@id").or_else(|| value.get("id"))?.as_i64()?;
    let name = str_field(value, "Name").unwrap_or_else(|| format!("group {id}"));
    Some(Group::new(id, name))
}

pub fn parse_tags(body: &Value) -> Vec<Tag> {
    annotations(body)
        .iter()
        .filter_map(|annotation| {
            Some(Tag {
                id: annotation.get("id")?.as_i64()?,
                name: str_field(annotation, "textValue")?,
                linked_by: link_owner(annotation),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapAnnotation {
    pub id: i64,
    pub values: Vec<(String, String)>,
}

pub fn parse_map_annotations(body: &Value) -> Vec<MapAnnotation> {
    annotations(body)
        .iter()
        .filter(|annotation| {
            annotation
                .get("ns")
                .and_then(|ns| ns.as_str())
                .is_none_or(|ns| ns == MAP_NAMESPACE)
        })
        .filter_map(|annotation| {
            let id = annotation.get("id")?.as_i64()?;
            let values = annotation
                .get("values")?
                .as_array()?
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    Some((
                        pair.first()?.as_str()?.to_string(),
                        pair.get(1)?.as_str()?.to_string(),
                    ))
                })
                .collect();
            Some(MapAnnotation { id, values })
        })
        .collect()
}

fn find_tag_id(body: &Value, name: &str) -> Option<i64> {
    body.get("tags")?
        .as_array()?
        .iter()
        .find(|tag| tag.get("value").and_then(|value| value.as_str()) == Some(name))
        .and_then(|tag| tag.get("id"))
        .and_then(|id| id.as_i64())
}

fn annotations(body: &Value) -> Vec<Value> {
    body.get("annotations")
        .and_then(|value| value.as_array())
        .cloned()
        .unwrap_or_default()
}

fn link_owner(annotation: &Value) -> i64 {
    annotation
        .get("link")
        .and_then(|link| link.get("owner"))
        .and_then(|owner| owner.get("id"))
        .and_then(|id| id.as_i64())
        .unwrap_or(-1)
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}

fn u32_field(value: &Value, field: &str) -> u32 {
    value
        .get(field)
        .and_then(|value| value.as_u64())
        .map(saturating_u32)
        .unwrap_or(0)
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn well_label(position: WellPosition) -> String {
    let mut row = String::new();
    let mut index = position.row as usize;
    loop {
        row.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    format!("{row}{}", position.column + 1)
}
