use anyhow::Result;
use uuid::Uuid;

use crate::auth::device::DeviceObservation;
use crate::db::DBLayer;
use crate::model::login_device::LoginDevice;

/// Upsert the registry row for this (user, fingerprint) pair.
///
/// Returns the row plus whether it was created by this call. A new row
/// starts unverified; an existing row gets its observable metadata and
/// last-login refreshed while the trust state is left alone. The row key
/// is the (user, fingerprint) pair itself, so concurrent logins from the
/// same device converge on one row.
pub async fn record_login(
    db: &DBLayer,
    user_id: &str,
    obs: &DeviceObservation,
) -> Result<(LoginDevice, bool)> {
    let fingerprint = obs.fingerprint();
    let now = chrono::Utc::now().timestamp();

    match db.load_login_device(user_id, &fingerprint).await? {
        Some(mut device) => {
            device.device_name = obs.device_name.clone();
            device.os = obs.os.clone();
            device.browser = obs.browser.clone();
            device.user_agent = obs.user_agent.clone();
            device.ip_address = obs.ip_address.clone();
            device.last_login_ts = now;
            db.save_login_device(&device).await?;
            Ok((device, false))
        }
        None => {
            let device = LoginDevice {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                fingerprint,
                device_name: obs.device_name.clone(),
                os: obs.os.clone(),
                browser: obs.browser.clone(),
                user_agent: obs.user_agent.clone(),
                ip_address: obs.ip_address.clone(),
                is_verified: false,
                verified_ts: None,
                created_ts: now,
                last_login_ts: now,
            };
            db.save_login_device(&device).await?;
            Ok((device, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(ua: &str, ip: &str) -> DeviceObservation {
        DeviceObservation {
            device_name: "Desktop".into(),
            os: "Windows 10.0".into(),
            browser: "Chrome 120.0".into(),
            user_agent: ua.into(),
            ip_address: Some(ip.into()),
            is_bot: false,
        }
    }

    #[tokio::test]
    async fn first_login_creates_unverified_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = DBLayer::new(dir.path().to_str().unwrap()).unwrap();

        let obs = observation("Mozilla/5.0 TestAgent", "203.0.113.5");
        let (device, created) = record_login(&db, "u1", &obs).await.unwrap();

        assert!(created);
        assert!(!device.is_verified);
        assert!(device.verified_ts.is_none());
        assert_eq!(device.fingerprint, obs.fingerprint());
    }

    #[tokio::test]
    async fn repeat_login_updates_metadata_keeps_trust() {
        let dir = tempfile::tempdir().unwrap();
        let db = DBLayer::new(dir.path().to_str().unwrap()).unwrap();

        let obs = observation("Mozilla/5.0 TestAgent", "203.0.113.5");
        let (mut device, _) = record_login(&db, "u1", &obs).await.unwrap();

        // verify out of band, as the verification endpoint would
        device.is_verified = true;
        device.verified_ts = Some(42);
        db.save_login_device(&device).await.unwrap();

        let mut second = obs.clone();
        second.browser = "Chrome 121.0".into();
        let (updated, created) = record_login(&db, "u1", &second).await.unwrap();

        assert!(!created);
        assert_eq!(updated.browser, "Chrome 121.0");
        assert!(updated.is_verified);
        assert_eq!(updated.verified_ts, Some(42));
        assert_eq!(db.list_devices_for_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn different_ip_registers_second_device() {
        let dir = tempfile::tempdir().unwrap();
        let db = DBLayer::new(dir.path().to_str().unwrap()).unwrap();

        let (_, first) = record_login(&db, "u1", &observation("UA", "203.0.113.5"))
            .await
            .unwrap();
        let (_, second) = record_login(&db, "u1", &observation("UA", "203.0.113.6"))
            .await
            .unwrap();

        assert!(first && second);
        assert_eq!(db.list_devices_for_user("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_logins_converge_on_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = std::sync::Arc::new(DBLayer::new(dir.path().to_str().unwrap()).unwrap());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let obs = observation("Mozilla/5.0 TestAgent", "203.0.113.5");
                record_login(&db, "u1", &obs).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(db.list_devices_for_user("u1").await.unwrap().len(), 1);
    }
}
