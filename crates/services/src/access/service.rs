use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use coursegate_config::AccessSettings;
use coursegate_db::models::{AccessCode, AccessGrant, GrantSource};
use tracing::{debug, error, info, warn};

use super::{
    clock::{Clock, SystemClock},
    code_generator::{CodeGenerator, RandomCodeGenerator},
    error::{AccessError, AccessResult},
    store::AccessStore,
};
use crate::dao::{access_code::CodeFilter, base::DaoError, user::UserSummary};

/// Batch request for `AccessService::generate_codes`.
#[derive(Debug, Clone)]
pub struct GenerateCodes {
    pub course_id: ObjectId,
    pub access_start_at: DateTime,
    pub access_end_at: DateTime,
    pub quantity: u32,
    pub code_expires_at: Option<DateTime>,
    pub created_by: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessStatus {
    pub has_access: bool,
    pub access_end_at: Option<DateTime>,
}

/// Code joined with its course title and redeemer for admin display.
#[derive(Debug, Clone)]
pub struct AccessCodeView {
    pub code: AccessCode,
    pub course_title: Option<String>,
    pub redeemer: Option<UserSummary>,
}

#[derive(Debug, Clone)]
pub struct AccessGrantView {
    pub grant: AccessGrant,
    pub course_title: Option<String>,
    pub is_active: bool,
}

pub struct AccessService {
    store: Arc<dyn AccessStore>,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    settings: AccessSettings,
}

impl AccessService {
    pub fn new(store: Arc<dyn AccessStore>, settings: AccessSettings) -> Self {
        let generator = Arc::new(RandomCodeGenerator::new(settings.code_length));
        Self::with_parts(store, generator, Arc::new(SystemClock), settings)
    }

    pub fn with_parts(
        store: Arc<dyn AccessStore>,
        generator: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
        settings: AccessSettings,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &AccessSettings {
        &self.settings
    }

    /// Creates `quantity` fresh unused codes sharing one course and window.
    pub async fn generate_codes(&self, request: GenerateCodes) -> AccessResult<Vec<AccessCode>> {
        validate_window(request.access_start_at, request.access_end_at)?;

        let max = self.settings.max_batch_size;
        if request.quantity == 0 || request.quantity > max {
            return Err(AccessError::InvalidArgument(format!(
                "quantity must be between 1 and {max}"
            )));
        }

        if !self.store.course_exists(request.course_id).await? {
            return Err(AccessError::CourseNotFound);
        }

        let now = self.clock.now();
        let mut codes = Vec::with_capacity(request.quantity as usize);
        for _ in 0..request.quantity {
            codes.push(self.create_unique_code(&request, now).await?);
        }

        info!(
            course_id = %request.course_id,
            created_by = %request.created_by,
            quantity = codes.len(),
            "Generated access codes"
        );
        Ok(codes)
    }

    async fn create_unique_code(
        &self,
        request: &GenerateCodes,
        now: DateTime,
    ) -> AccessResult<AccessCode> {
        let attempts = self.settings.max_generation_attempts.max(1);

        for attempt in 1..=attempts {
            let candidate = self.generator.generate();
            if self.store.code_exists(&candidate).await? {
                debug!(attempt, "Generated code already taken");
                continue;
            }

            let code = AccessCode {
                id: None,
                code: candidate,
                course_id: request.course_id,
                access_start_at: request.access_start_at,
                access_end_at: request.access_end_at,
                code_expires_at: request.code_expires_at,
                is_used: false,
                used_by: None,
                used_at: None,
                created_by: request.created_by,
                created_at: now,
                updated_at: now,
            };

            match self.store.insert_code(&code).await {
                Ok(stored) => return Ok(stored),
                // Lost a race with a concurrent batch
                Err(DaoError::DuplicateKey(_)) => {
                    debug!(attempt, "Code collided on insert");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts, course_id = %request.course_id, "Code generation attempts exhausted");
        Err(AccessError::CodeSpaceExhausted { attempts })
    }

    /// Exchanges an unused code for an access grant.
    ///
    /// Every check runs before the code is touched. The code is then claimed
    /// with a conditional update, so of several concurrent redemptions only
    /// one proceeds to create the grant. A claim is released again only when
    /// the grant write failed and no grant references the code.
    pub async fn redeem(
        &self,
        code: &str,
        course_id: ObjectId,
        user_id: ObjectId,
    ) -> AccessResult<AccessGrant> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AccessError::InvalidArgument("code is required".to_string()));
        }

        let now = self.clock.now();
        let found = self
            .store
            .find_redeemable_code(code, now)
            .await?
            .ok_or(AccessError::InvalidOrExpiredCode)?;

        if found.course_id != course_id {
            return Err(AccessError::CodeCourseMismatch);
        }

        if !self.store.course_exists(course_id).await? {
            return Err(AccessError::CourseNotFound);
        }

        if now > found.access_end_at {
            return Err(AccessError::WindowExpired);
        }

        let code_id = found.id.ok_or(AccessError::InvalidOrExpiredCode)?;
        if !self.store.claim_code(code_id, user_id, now).await? {
            debug!(%code_id, %user_id, "Code claimed by a concurrent redemption");
            return Err(AccessError::InvalidOrExpiredCode);
        }

        let grant = AccessGrant {
            id: None,
            user_id,
            course_id,
            access_start_at: found.access_start_at,
            access_end_at: found.access_end_at,
            source: GrantSource::Code,
            code_id: Some(code_id),
            granted_by: None,
            created_at: now,
        };

        match self.store.insert_grant(&grant).await {
            Ok(stored) => {
                info!(%code_id, %user_id, %course_id, "Access code redeemed");
                Ok(stored)
            }
            // A grant for this code already exists, so the claim stands.
            Err(DaoError::DuplicateKey(_)) => {
                warn!(%code_id, %user_id, "Code already has a grant, keeping it used");
                Err(AccessError::InvalidOrExpiredCode)
            }
            Err(e) => self.recover_failed_grant(code_id, user_id, e).await,
        }
    }

    /// The grant write may have landed even though the store reported an
    /// error. The claim is only released when no grant references the code.
    async fn recover_failed_grant(
        &self,
        code_id: ObjectId,
        user_id: ObjectId,
        cause: DaoError,
    ) -> AccessResult<AccessGrant> {
        match self.store.find_grant_by_code(code_id).await {
            Ok(Some(existing)) if existing.user_id == user_id => {
                warn!(%code_id, %user_id, error = %cause, "Grant insert reported failure but was written");
                Ok(existing)
            }
            Ok(Some(existing)) => {
                warn!(%code_id, holder = %existing.user_id, "Code already granted to another user");
                Err(AccessError::InvalidOrExpiredCode)
            }
            Ok(None) => {
                warn!(%code_id, %user_id, error = %cause, "Grant insert failed, releasing code");
                if let Err(release_err) = self.store.release_code(code_id, user_id).await {
                    error!(%code_id, error = %release_err, "Failed to release claimed code");
                }
                Err(cause.into())
            }
            Err(lookup_err) => {
                // Unknown outcome: keep the code used rather than risk a second grant.
                error!(%code_id, error = %lookup_err, "Could not verify grant after failed insert");
                Err(cause.into())
            }
        }
    }

    pub async fn has_access(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
    ) -> AccessResult<AccessStatus> {
        let now = self.clock.now();
        let grant = self
            .store
            .latest_active_grant(user_id, course_id, now)
            .await?;

        Ok(AccessStatus {
            has_access: grant.is_some(),
            access_end_at: grant.map(|g| g.access_end_at),
        })
    }

    /// Codes matching `filter`, newest first, with display fields joined in.
    pub async fn list_codes(&self, filter: &CodeFilter) -> AccessResult<Vec<AccessCodeView>> {
        let codes = self.store.list_codes(filter).await?;

        let course_ids: Vec<ObjectId> = codes
            .iter()
            .map(|c| c.course_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let user_ids: Vec<ObjectId> = codes
            .iter()
            .filter_map(|c| c.used_by)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let titles = self.store.course_titles(&course_ids).await?;
        let users = self.store.user_summaries(&user_ids).await?;

        Ok(codes
            .into_iter()
            .map(|code| AccessCodeView {
                course_title: titles.get(&code.course_id).cloned(),
                redeemer: code.used_by.and_then(|id| users.get(&id).cloned()),
                code,
            })
            .collect())
    }

    /// Admin-issued grant that bypasses codes.
    pub async fn grant_access(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
        access_start_at: DateTime,
        access_end_at: DateTime,
        granted_by: ObjectId,
    ) -> AccessResult<AccessGrant> {
        validate_window(access_start_at, access_end_at)?;

        if !self.store.course_exists(course_id).await? {
            return Err(AccessError::CourseNotFound);
        }
        if !self.store.user_exists(user_id).await? {
            return Err(AccessError::UserNotFound);
        }

        let grant = AccessGrant {
            id: None,
            user_id,
            course_id,
            access_start_at,
            access_end_at,
            source: GrantSource::Manual,
            code_id: None,
            granted_by: Some(granted_by),
            created_at: self.clock.now(),
        };

        let stored = self.store.insert_grant(&grant).await?;
        info!(%user_id, %course_id, %granted_by, "Manual access granted");
        Ok(stored)
    }

    pub async fn list_user_grants(&self, user_id: ObjectId) -> AccessResult<Vec<AccessGrantView>> {
        let grants = self.store.list_user_grants(user_id).await?;
        let course_ids: Vec<ObjectId> = grants
            .iter()
            .map(|g| g.course_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let titles: HashMap<ObjectId, String> = self.store.course_titles(&course_ids).await?;
        let now = self.clock.now();

        Ok(grants
            .into_iter()
            .map(|grant| AccessGrantView {
                course_title: titles.get(&grant.course_id).cloned(),
                is_active: grant.is_active_at(now),
                grant,
            })
            .collect())
    }
}

fn validate_window(start: DateTime, end: DateTime) -> AccessResult<()> {
    if end <= start {
        return Err(AccessError::InvalidArgument(
            "accessEndAt must be after accessStartAt".to_string(),
        ));
    }
    Ok(())
}
