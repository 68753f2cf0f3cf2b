use anyhow::Result;
use rocksdb::{Direction, IteratorMode, Options, DB};

use crate::model::{
    application::{Application, ApplicationStatus},
    job::Job,
    legal::{ContactMessage, LegalDocument},
    login_device::LoginDevice,
    notification::Notification,
    user::{User, UserRole},
};

pub struct DBLayer {
    db: DB,
    // serializes insert_user's check-then-put on the email index
    email_lock: std::sync::Mutex<()>,
}

impl DBLayer {
    pub fn new(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            email_lock: std::sync::Mutex::new(()),
        })
    }

    fn prefix_scan<T: serde::de::DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = std::str::from_utf8(&key)?;
            if !k.starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(&val)?);
        }
        Ok(out)
    }

    // ============================================================
    // USER STORAGE
    // ============================================================
    fn user_key(id: &str) -> String {
        format!("user:{id}")
    }

    fn user_email_key(email: &str) -> String {
        format!("user_email:{email}")
    }

    /// Creates a user only when the email is unclaimed; returns false when
    /// another account already holds the address. The lock keeps the index
    /// check and the puts together, so two racing registrations cannot both
    /// claim the same email.
    pub async fn insert_user(&self, user: &User) -> Result<bool> {
        let _guard = self.email_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.db.get(Self::user_email_key(&user.email))?.is_some() {
            return Ok(false);
        }
        self.db
            .put(Self::user_key(&user.id), serde_json::to_vec(user)?)?;
        // email → id index for login and OAuth get-or-create
        self.db
            .put(Self::user_email_key(&user.email), user.id.as_bytes())?;
        Ok(true)
    }

    /// Update path; new accounts go through `insert_user` so the email
    /// index is claimed exactly once. The email of an existing account
    /// never changes, so rewriting its index entry is idempotent.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        let val = serde_json::to_vec(user)?;
        self.db.put(Self::user_key(&user.id), val)?;
        self.db
            .put(Self::user_email_key(&user.email), user.id.as_bytes())?;
        Ok(())
    }

    pub async fn load_user(&self, id: &str) -> Result<Option<User>> {
        match self.db.get(Self::user_key(id))? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(id) = self.db.get(Self::user_email_key(email))? else {
            return Ok(None);
        };
        self.load_user(std::str::from_utf8(&id)?).await
    }

    pub async fn list_users_with_role(&self, role: UserRole) -> Result<Vec<User>> {
        let users: Vec<User> = self.prefix_scan("user:")?;
        Ok(users.into_iter().filter(|u| u.role == role).collect())
    }

    // ============================================================
    // LOGIN DEVICE REGISTRY
    // ============================================================
    // (user_id, fingerprint) is the row key, so the keyspace itself is the
    // uniqueness constraint: two racing logins from the same device land on
    // the same key and can never produce two rows.
    fn login_device_key(user_id: &str, fingerprint: &str) -> String {
        format!("login_device:{user_id}:{fingerprint}")
    }

    fn device_lookup_key(fingerprint: &str) -> String {
        format!("device_lookup:{fingerprint}")
    }

    pub async fn load_login_device(
        &self,
        user_id: &str,
        fingerprint: &str,
    ) -> Result<Option<LoginDevice>> {
        match self.db.get(Self::login_device_key(user_id, fingerprint))? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn save_login_device(&self, device: &LoginDevice) -> Result<()> {
        let key = Self::login_device_key(&device.user_id, &device.fingerprint);
        self.db.put(key, serde_json::to_vec(device)?)?;
        // fast lookup: fingerprint → owning user, for verification links
        self.db.put(
            Self::device_lookup_key(&device.fingerprint),
            device.user_id.as_bytes(),
        )?;
        Ok(())
    }

    pub async fn find_login_device_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<LoginDevice>> {
        let Some(user_id) = self.db.get(Self::device_lookup_key(fingerprint))? else {
            return Ok(None);
        };
        self.load_login_device(std::str::from_utf8(&user_id)?, fingerprint)
            .await
    }

    pub async fn list_devices_for_user(&self, user_id: &str) -> Result<Vec<LoginDevice>> {
        self.prefix_scan(&format!("login_device:{user_id}:"))
    }

    // ============================================================
    // JOBS
    // ============================================================
    fn job_key(id: &str) -> String {
        format!("job:{id}")
    }

    pub async fn save_job(&self, job: &Job) -> Result<()> {
        self.db
            .put(Self::job_key(&job.id), serde_json::to_vec(job)?)?;
        Ok(())
    }

    pub async fn load_job(&self, id: &str) -> Result<Option<Job>> {
        match self.db.get(Self::job_key(id))? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_job(&self, id: &str) -> Result<()> {
        self.db.delete(Self::job_key(id))?;
        Ok(())
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.prefix_scan("job:")?;
        jobs.sort_by_key(|j| std::cmp::Reverse(j.created_ts));
        Ok(jobs)
    }

    pub async fn list_jobs_for_employer(&self, employer_id: &str) -> Result<Vec<Job>> {
        let jobs = self.list_jobs().await?;
        Ok(jobs
            .into_iter()
            .filter(|j| j.employer_id == employer_id)
            .collect())
    }

    // ============================================================
    // APPLICATIONS
    // ============================================================
    // Pair key keeps one application per (job, seeker); the id index lets
    // status updates address a single application directly.
    fn application_key(job_id: &str, seeker_id: &str) -> String {
        format!("application:{job_id}:{seeker_id}")
    }

    fn application_id_key(id: &str) -> String {
        format!("application_id:{id}")
    }

    pub async fn save_application(&self, app: &Application) -> Result<()> {
        let key = Self::application_key(&app.job_id, &app.seeker_id);
        self.db.put(&key, serde_json::to_vec(app)?)?;
        self.db
            .put(Self::application_id_key(&app.id), key.as_bytes())?;
        Ok(())
    }

    pub async fn find_application(
        &self,
        job_id: &str,
        seeker_id: &str,
    ) -> Result<Option<Application>> {
        match self.db.get(Self::application_key(job_id, seeker_id))? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn load_application(&self, id: &str) -> Result<Option<Application>> {
        let Some(key) = self.db.get(Self::application_id_key(id))? else {
            return Ok(None);
        };
        match self.db.get(&key)? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn list_applications_for_job(&self, job_id: &str) -> Result<Vec<Application>> {
        self.prefix_scan(&format!("application:{job_id}:"))
    }

    pub async fn list_applications_for_seeker(&self, seeker_id: &str) -> Result<Vec<Application>> {
        let all: Vec<Application> = self.prefix_scan("application:")?;
        Ok(all
            .into_iter()
            .filter(|a| a.seeker_id == seeker_id)
            .collect())
    }

    pub async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        now_ts: i64,
    ) -> Result<Option<Application>> {
        let Some(mut app) = self.load_application(id).await? else {
            return Ok(None);
        };
        app.status = status;
        app.updated_ts = now_ts;
        self.save_application(&app).await?;
        Ok(Some(app))
    }

    // ============================================================
    // NOTIFICATIONS (USER-ORDERED)
    // ============================================================
    fn notification_key(user_id: &str, ts: i64, id: &str) -> String {
        format!("notification:{user_id}:{ts:020}:{id}")
        // 020 → zero-padded timestamp for correct sorting
    }

    fn notification_prefix(user_id: &str) -> String {
        format!("notification:{user_id}:")
    }

    pub async fn push_notification(&self, n: &Notification) -> Result<()> {
        let key = Self::notification_key(&n.user_id, n.created_ts, &n.id);
        self.db.put(key, serde_json::to_vec(n)?)?;
        Ok(())
    }

    pub async fn list_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let mut out: Vec<Notification> = self.prefix_scan(&Self::notification_prefix(user_id))?;
        out.reverse(); // newest first
        Ok(out)
    }

    fn find_notification_entry(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<(String, Notification)>> {
        let prefix = Self::notification_prefix(user_id);
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = std::str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }
            let n: Notification = serde_json::from_slice(&val)?;
            if n.id == id {
                return Ok(Some((k.to_string(), n)));
            }
        }
        Ok(None)
    }

    pub async fn set_notification_read(
        &self,
        user_id: &str,
        id: &str,
        is_read: bool,
    ) -> Result<bool> {
        let Some((key, mut n)) = self.find_notification_entry(user_id, id)? else {
            return Ok(false);
        };
        n.is_read = is_read;
        self.db.put(key, serde_json::to_vec(&n)?)?;
        Ok(true)
    }

    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        let prefix = Self::notification_prefix(user_id);
        let mut pending = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, val) = item?;
            let k = std::str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }
            let mut n: Notification = serde_json::from_slice(&val)?;
            if !n.is_read {
                n.is_read = true;
                pending.push((k.to_string(), serde_json::to_vec(&n)?));
            }
        }
        let updated = pending.len();
        for (key, val) in pending {
            self.db.put(key, val)?;
        }
        Ok(updated)
    }

    pub async fn delete_notification(&self, user_id: &str, id: &str) -> Result<bool> {
        let Some((key, _)) = self.find_notification_entry(user_id, id)? else {
            return Ok(false);
        };
        self.db.delete(key)?;
        Ok(true)
    }

    pub async fn delete_all_notifications(&self, user_id: &str) -> Result<usize> {
        let prefix = Self::notification_prefix(user_id);
        let mut keys = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
        {
            let (key, _) = item?;
            let k = std::str::from_utf8(&key)?;
            if !k.starts_with(&prefix) {
                break;
            }
            keys.push(k.to_string());
        }
        let count = keys.len();
        for key in keys {
            self.db.delete(key)?;
        }
        Ok(count)
    }

    // ============================================================
    // LEGAL PAGES & CONTACT MESSAGES
    // ============================================================
    fn legal_key(kind: &str) -> String {
        format!("legal:{kind}")
    }

    pub async fn save_legal_document(&self, kind: &str, doc: &LegalDocument) -> Result<()> {
        self.db
            .put(Self::legal_key(kind), serde_json::to_vec(doc)?)?;
        Ok(())
    }

    pub async fn load_legal_document(&self, kind: &str) -> Result<Option<LegalDocument>> {
        match self.db.get(Self::legal_key(kind))? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn save_contact_message(&self, msg: &ContactMessage) -> Result<()> {
        let key = format!("contact:{:020}:{}", msg.created_ts, msg.id);
        self.db.put(key, serde_json::to_vec(msg)?)?;
        Ok(())
    }

    pub async fn list_contact_messages(&self) -> Result<Vec<ContactMessage>> {
        let mut out: Vec<ContactMessage> = self.prefix_scan("contact:")?;
        out.reverse();
        Ok(out)
    }

    pub async fn set_contact_message_read(&self, id: &str) -> Result<bool> {
        for item in self
            .db
            .iterator(IteratorMode::From(b"contact:", Direction::Forward))
        {
            let (key, val) = item?;
            let k = std::str::from_utf8(&key)?;
            if !k.starts_with("contact:") {
                break;
            }
            let mut msg: ContactMessage = serde_json::from_slice(&val)?;
            if msg.id == id {
                msg.is_read = true;
                self.db.put(k.to_string(), serde_json::to_vec(&msg)?)?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::notification::NotificationKind;

    fn open_db() -> (tempfile::TempDir, DBLayer) {
        let dir = tempfile::tempdir().unwrap();
        let db = DBLayer::new(dir.path().to_str().unwrap()).unwrap();
        (dir, db)
    }

    fn sample_user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            email: email.into(),
            full_name: None,
            created_ts: 1_700_000_000,
            password_hash: None,
            role: UserRole::JobSeeker,
            company_name: None,
            is_email_verified: false,
            meta: None,
        }
    }

    #[tokio::test]
    async fn user_email_index_round_trips() {
        let (_dir, db) = open_db();
        assert!(db
            .insert_user(&sample_user("u1", "a@example.com"))
            .await
            .unwrap());

        let found = db.find_user_by_email("a@example.com").await.unwrap();
        assert_eq!(found.unwrap().id, "u1");
        assert!(db
            .find_user_by_email("b@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn second_insert_for_same_email_refused() {
        let (_dir, db) = open_db();
        assert!(db
            .insert_user(&sample_user("u1", "a@example.com"))
            .await
            .unwrap());
        assert!(!db
            .insert_user(&sample_user("u2", "a@example.com"))
            .await
            .unwrap());

        // the loser leaves no row and no dangling index entry
        assert!(db.load_user("u2").await.unwrap().is_none());
        assert_eq!(
            db.find_user_by_email("a@example.com").await.unwrap().unwrap().id,
            "u1"
        );
    }

    #[tokio::test]
    async fn racing_inserts_claim_email_once() {
        let (_dir, db) = open_db();
        let db = std::sync::Arc::new(db);

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.insert_user(&sample_user(&format!("u{i}"), "a@example.com"))
                    .await
                    .unwrap()
            }));
        }
        let mut claimed = 0;
        for h in handles {
            if h.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
        assert_eq!(
            db.list_users_with_role(UserRole::JobSeeker)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn device_keyed_by_user_and_fingerprint() {
        let (_dir, db) = open_db();
        let device = LoginDevice {
            id: "d1".into(),
            user_id: "u1".into(),
            fingerprint: "fp1".into(),
            device_name: "Other".into(),
            os: "Linux".into(),
            browser: "Firefox".into(),
            user_agent: "ua".into(),
            ip_address: Some("203.0.113.5".into()),
            is_verified: false,
            verified_ts: None,
            created_ts: 1,
            last_login_ts: 1,
        };
        db.save_login_device(&device).await.unwrap();
        // same key twice → still one row
        db.save_login_device(&device).await.unwrap();

        let rows = db.list_devices_for_user("u1").await.unwrap();
        assert_eq!(rows.len(), 1);

        let by_fp = db.find_login_device_by_fingerprint("fp1").await.unwrap();
        assert_eq!(by_fp.unwrap().user_id, "u1");
    }

    #[tokio::test]
    async fn notifications_sorted_newest_first_and_mutable() {
        let (_dir, db) = open_db();
        for (i, id) in ["n1", "n2", "n3"].iter().enumerate() {
            db.push_notification(&Notification {
                id: (*id).into(),
                user_id: "u1".into(),
                kind: NotificationKind::Job,
                message: format!("m{i}"),
                subject_id: None,
                is_read: false,
                created_ts: 100 + i as i64,
            })
            .await
            .unwrap();
        }

        let list = db.list_notifications_for_user("u1").await.unwrap();
        assert_eq!(list[0].id, "n3");

        assert!(db.set_notification_read("u1", "n2", true).await.unwrap());
        let list = db.list_notifications_for_user("u1").await.unwrap();
        assert!(list.iter().find(|n| n.id == "n2").unwrap().is_read);

        assert_eq!(db.mark_all_notifications_read("u1").await.unwrap(), 2);
        assert!(db.delete_notification("u1", "n1").await.unwrap());
        assert_eq!(db.delete_all_notifications("u1").await.unwrap(), 2);
        assert!(db
            .list_notifications_for_user("u1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn application_pair_key_and_id_index() {
        let (_dir, db) = open_db();
        let app = Application {
            id: "a1".into(),
            job_id: "j1".into(),
            seeker_id: "s1".into(),
            cover_letter: None,
            status: ApplicationStatus::Submitted,
            created_ts: 5,
            updated_ts: 5,
        };
        db.save_application(&app).await.unwrap();

        assert!(db.find_application("j1", "s1").await.unwrap().is_some());
        let updated = db
            .set_application_status("a1", ApplicationStatus::Reviewed, 9)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::Reviewed);
        assert_eq!(updated.updated_ts, 9);
        assert_eq!(db.list_applications_for_job("j1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn contact_message_mark_read() {
        let (_dir, db) = open_db();
        for (id, ts) in [("c1", 10), ("c2", 20)] {
            db.save_contact_message(&ContactMessage {
                id: id.into(),
                full_name: "A Person".into(),
                email: "a@example.com".into(),
                subject: crate::model::legal::ContactSubject::General,
                message: "hello".into(),
                phone: None,
                is_read: false,
                created_ts: ts,
            })
            .await
            .unwrap();
        }

        assert!(db.set_contact_message_read("c1").await.unwrap());
        assert!(!db.set_contact_message_read("missing").await.unwrap());

        let list = db.list_contact_messages().await.unwrap();
        assert!(list.iter().find(|m| m.id == "c1").unwrap().is_read);
        assert!(!list.iter().find(|m| m.id == "c2").unwrap().is_read);
    }
}
