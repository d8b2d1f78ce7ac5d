// ============================================================================
// Course Catalog & Entitlement Gate
// ============================================================================
//
// Enrollments, packages and content objects are owned by the surrounding
// platform; the runtime only reads them through the `CourseCatalog` trait.
// The gate verifies a caller/enrollment/content-object triple before any
// session state is touched and has no side effects on failure.
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::{
    ContentObjectId, CreditMode, DialectKind, EnrollmentId, LaunchContext, LaunchMode, LearnerId,
    PackageId, Result, RuntimeError,
};

/// Publication status of a learning package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Draft,
    Processing,
    Ready,
    Disabled,
}

impl PackageStatus {
    pub fn is_launch_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPackage {
    pub id: PackageId,
    pub title: String,
    pub status: PackageStatus,
}

/// Links a learner to a package, with the launch attributes synthesized
/// into the session's read-only elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub learner_id: LearnerId,
    pub learner_name: String,
    pub package_id: PackageId,
    pub credit: CreditMode,
    pub mode: LaunchMode,
}

/// A single launchable unit of learning content (SCO) within a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentObject {
    pub id: ContentObjectId,
    pub package_id: PackageId,
    pub title: String,
    pub launchable: bool,
    pub dialect: DialectKind,
}

#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>>;
    async fn package(&self, id: PackageId) -> Result<Option<LearningPackage>>;
    async fn content_object(&self, id: ContentObjectId) -> Result<Option<ContentObject>>;
}

/// Outcome of a successful gate check.
#[derive(Debug, Clone)]
pub struct LaunchAuthorization {
    pub enrollment: Enrollment,
    pub content_object: ContentObject,
}

impl LaunchAuthorization {
    pub fn dialect(&self) -> DialectKind {
        self.content_object.dialect
    }

    pub fn launch_context(&self) -> LaunchContext {
        LaunchContext {
            learner_id: self.enrollment.learner_id,
            learner_name: self.enrollment.learner_name.clone(),
            credit: self.enrollment.credit,
            mode: self.enrollment.mode,
        }
    }
}

pub struct EntitlementGate<C: CourseCatalog + ?Sized> {
    catalog: std::sync::Arc<C>,
}

impl<C: CourseCatalog + ?Sized> EntitlementGate<C> {
    pub fn new(catalog: std::sync::Arc<C>) -> Self {
        Self { catalog }
    }

    /// Verify the caller may launch the enrollment/content-object pair.
    pub async fn authorize(
        &self,
        caller: LearnerId,
        enrollment_id: EnrollmentId,
        content_object_id: ContentObjectId,
    ) -> Result<LaunchAuthorization> {
        let enrollment = self
            .catalog
            .enrollment(enrollment_id)
            .await?
            .ok_or_else(|| RuntimeError::Entitlement("enrollment not found".to_string()))?;

        if enrollment.learner_id != caller {
            return Err(RuntimeError::Entitlement(
                "enrollment does not belong to caller".to_string(),
            ));
        }

        let package = self
            .catalog
            .package(enrollment.package_id)
            .await?
            .ok_or_else(|| RuntimeError::Entitlement("package not found".to_string()))?;

        if !package.status.is_launch_ready() {
            return Err(RuntimeError::PackageNotReady(format!(
                "package '{}' is {:?}",
                package.title, package.status
            )));
        }

        let content_object = self
            .catalog
            .content_object(content_object_id)
            .await?
            .ok_or_else(|| RuntimeError::Entitlement("content object not found".to_string()))?;

        if content_object.package_id != enrollment.package_id {
            return Err(RuntimeError::Entitlement(
                "content object outside enrolled package".to_string(),
            ));
        }

        if !content_object.launchable {
            return Err(RuntimeError::Entitlement(
                "content object is not launchable".to_string(),
            ));
        }

        Ok(LaunchAuthorization {
            enrollment,
            content_object,
        })
    }
}

#[derive(Default)]
struct CatalogInner {
    enrollments: HashMap<EnrollmentId, Enrollment>,
    packages: HashMap<PackageId, LearningPackage>,
    content_objects: HashMap<ContentObjectId, ContentObject>,
}

/// Catalog backed by process memory, for tests and embedded use.
#[derive(Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogInner>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_package(&self, package: LearningPackage) {
        self.inner.write().await.packages.insert(package.id, package);
    }

    pub async fn insert_enrollment(&self, enrollment: Enrollment) {
        self.inner
            .write()
            .await
            .enrollments
            .insert(enrollment.id, enrollment);
    }

    pub async fn insert_content_object(&self, object: ContentObject) {
        self.inner
            .write()
            .await
            .content_objects
            .insert(object.id, object);
    }

    /// Seed a ready package with one launchable object and one enrollment.
    pub async fn seed_launchable(
        &self,
        learner_id: LearnerId,
        learner_name: &str,
        dialect: DialectKind,
    ) -> (EnrollmentId, ContentObjectId) {
        let package_id = Uuid::new_v4();
        let enrollment_id = Uuid::new_v4();
        let content_object_id = Uuid::new_v4();

        self.insert_package(LearningPackage {
            id: package_id,
            title: "seeded package".to_string(),
            status: PackageStatus::Ready,
        })
        .await;
        self.insert_enrollment(Enrollment {
            id: enrollment_id,
            learner_id,
            learner_name: learner_name.to_string(),
            package_id,
            credit: CreditMode::Credit,
            mode: LaunchMode::Normal,
        })
        .await;
        self.insert_content_object(ContentObject {
            id: content_object_id,
            package_id,
            title: "seeded content object".to_string(),
            launchable: true,
            dialect,
        })
        .await;

        (enrollment_id, content_object_id)
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>> {
        Ok(self.inner.read().await.enrollments.get(&id).cloned())
    }

    async fn package(&self, id: PackageId) -> Result<Option<LearningPackage>> {
        Ok(self.inner.read().await.packages.get(&id).cloned())
    }

    async fn content_object(&self, id: ContentObjectId) -> Result<Option<ContentObject>> {
        Ok(self.inner.read().await.content_objects.get(&id).cloned())
    }
}
