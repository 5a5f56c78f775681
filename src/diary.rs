//! Typed diary endpoints. Every call runs under the refresh protocol of [`AuthorizedClient`].

// crates.io
use serde_json::Value;
use time::{Date, format_description::StaticFormatDescription, macros::format_description};
// self
use crate::{
	_prelude::*,
	client::AuthorizedClient,
	error::{ApplicationError, ConfigError},
	refresh::RefreshService,
	transport::{HttpTransport, RequestDescriptor},
};

const DIARY_DATE: StaticFormatDescription = format_description!("[year]-[month]-[day]");

time::serde::format_description!(diary_date, Date, DIARY_DATE);

/// Calendar event as served by the events feed.
///
/// Fields other than `title` and `start` are passed through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
	/// Event label.
	pub title: String,
	/// Start date or date-time, as sent by the server.
	pub start: String,
	/// Remaining fields.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Stored diary entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
	/// Server identifier used by [`DiaryApi::update`].
	pub diary_id: i64,
	/// Day the entry belongs to.
	#[serde(with = "diary_date")]
	pub date: Date,
	/// Entry title.
	#[serde(default)]
	pub title: String,
	/// Entry body.
	#[serde(default)]
	pub content: String,
}

/// New entry for [`DiaryApi::save`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiaryDraft {
	/// Day the entry belongs to.
	#[serde(with = "diary_date")]
	pub date: Date,
	/// Entry title.
	pub title: String,
	/// Entry body.
	pub content: String,
}

/// Replacement text for [`DiaryApi::update`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiaryUpdate {
	/// Entry title.
	pub title: String,
	/// Entry body.
	pub content: String,
}

#[derive(Debug, Deserialize)]
struct EntriesBody {
	#[serde(default)]
	diaries: Vec<DiaryEntry>,
}

/// Diary CRUD for one user session.
pub struct DiaryApi<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	client: AuthorizedClient<T, R>,
}
impl<T, R> DiaryApi<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	/// Wraps an authorized client.
	pub fn new(client: AuthorizedClient<T, R>) -> Self {
		Self { client }
	}

	/// All calendar events of the current user.
	pub async fn events(&self) -> Result<Vec<CalendarEvent>> {
		let path = self.client.config.endpoints.diary_events.as_str();

		self.client.execute(&RequestDescriptor::get(path)).await?.into_result()
	}

	/// Entries written on `date`.
	pub async fn entries_on(&self, date: Date) -> Result<Vec<DiaryEntry>> {
		let path = &self.client.config.endpoints.diary_entries;
		let descriptor = RequestDescriptor::get(format!("{path}?date={}", query_date(date)?));
		let body: EntriesBody = self.client.execute(&descriptor).await?.into_result()?;

		Ok(body.diaries)
	}

	/// Stores a new entry.
	pub async fn save(&self, draft: &DiaryDraft) -> Result<()> {
		ensure_filled("title", &draft.title)?;
		ensure_filled("content", &draft.content)?;

		let path = self.client.config.endpoints.diary_save.as_str();

		self.mutate(RequestDescriptor::post(path).json(draft)?).await
	}

	/// Replaces the title and body of entry `diary_id`.
	pub async fn update(&self, diary_id: i64, update: &DiaryUpdate) -> Result<()> {
		ensure_filled("title", &update.title)?;
		ensure_filled("content", &update.content)?;

		let prefix = self.client.config.endpoints.diary_update.trim_end_matches('/');

		self.mutate(RequestDescriptor::put(format!("{prefix}/{diary_id}")).json(update)?).await
	}

	async fn mutate(&self, descriptor: RequestDescriptor) -> Result<()> {
		let ack: Value = self.client.execute(&descriptor).await?.into_result()?;

		if ack.get("result").and_then(Value::as_bool) == Some(false) {
			let message = ack
				.get("msg")
				.and_then(Value::as_str)
				.unwrap_or("Diary server rejected the change.")
				.to_owned();

			return Err(ApplicationError::Rejected { message }.into());
		}

		Ok(())
	}
}
impl<T, R> Debug for DiaryApi<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DiaryApi").field("client", &self.client).finish()
	}
}

fn ensure_filled(field: &'static str, value: &str) -> Result<()> {
	if value.trim().is_empty() { Err(Error::IncompleteDraft { field }) } else { Ok(()) }
}

fn query_date(date: Date) -> Result<String, ConfigError> {
	Ok(date.format(DIARY_DATE)?)
}
