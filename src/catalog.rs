// src/catalog.rs

use crate::{
    constants::{self, keys},
    error::{AppError, AppResult},
    models::{
        Compatibility, Course, Lesson, LessonDraft, LessonUpdate, Module, Offering,
        OfferingUpdate, ProductType, Resource, ResourceStatus, Viewer, VideoProvider,
    },
    publication::{self, PublicationAction, PublicationState},
    storage::{self, SharedStore},
    utils,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remote side of the catalog: product rows and the object store holding resource files.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    fn storage_bucket(&self) -> &str {
        constants::DEFAULT_STORAGE_BUCKET
    }
    async fn fetch_products(&self) -> AppResult<Vec<Offering>>;
    async fn patch_product(&self, product_id: &str, update: &OfferingUpdate) -> AppResult<()>;
    async fn patch_product_image(&self, product_id: &str, image: &str) -> AppResult<()>;
    async fn upload_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CatalogSnapshot {
    offerings: Vec<Offering>,
    courses: BTreeMap<String, Course>,
}

pub struct CatalogStore {
    offerings: Vec<Offering>,
    courses: BTreeMap<String, Course>,
    store: SharedStore,
}

impl CatalogStore {
    /// Local snapshot if one exists, otherwise the built-in catalog.
    pub fn load(store: SharedStore) -> Self {
        let snapshot = storage::load_json::<CatalogSnapshot>(store.as_ref(), keys::CATALOG)
            .filter(|s| !s.offerings.is_empty())
            .unwrap_or_else(|| {
                debug!("Aucun instantané du catalogue, utilisation du catalogue intégré");
                CatalogSnapshot {
                    offerings: fallback_offerings(),
                    courses: seed_courses(),
                }
            });
        Self {
            offerings: snapshot.offerings,
            courses: snapshot.courses,
            store,
        }
    }

    /// Replaces offerings with the backend's rows. Resources are not stored with the rows,
    /// so the ones already known locally are carried over. Failures keep the current list.
    pub async fn refresh_from_remote(&mut self, backend: &dyn CatalogBackend) -> bool {
        match backend.fetch_products().await {
            Ok(rows) if !rows.is_empty() => {
                let merged: Vec<Offering> = rows
                    .into_iter()
                    .map(|mut remote| {
                        remote.current_resource = self
                            .offering(&remote.id)
                            .and_then(|local| local.current_resource.clone());
                        remote
                    })
                    .collect();
                info!("{} produit(s) chargé(s) depuis le backend", merged.len());
                self.offerings = merged;
                true
            }
            Ok(_) => {
                debug!("Table des produits vide, catalogue local conservé");
                false
            }
            Err(e) => {
                warn!("Chargement des produits impossible, catalogue local conservé: {}", e);
                false
            }
        }
    }

    pub fn offerings(&self) -> &[Offering] {
        &self.offerings
    }

    pub fn offering(&self, id: &str) -> Option<&Offering> {
        self.offerings.iter().find(|o| o.id == id)
    }

    pub fn require_offering(&self, id: &str) -> AppResult<&Offering> {
        self.offering(id)
            .ok_or_else(|| AppError::NotFound(format!("produit '{}'", id)))
    }

    pub fn course(&self, product_id: &str) -> Option<&Course> {
        self.courses.get(product_id)
    }

    fn offering_mut(&mut self, id: &str) -> AppResult<&mut Offering> {
        self.offerings
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| AppError::NotFound(format!("produit '{}'", id)))
    }

    // --- Admin: offerings ---

    pub async fn update_product_details(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        update: &OfferingUpdate,
        backend: &dyn CatalogBackend,
    ) -> AppResult<()> {
        require_admin(viewer)?;
        if update.is_empty() {
            return Ok(());
        }
        update.apply_to(self.offering_mut(product_id)?);
        self.persist()?;
        if let Err(e) = backend.patch_product(product_id, update).await {
            warn!("Synchronisation du produit '{}' échouée: {}", product_id, e);
        }
        Ok(())
    }

    pub async fn update_product_image(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        image: &str,
        backend: &dyn CatalogBackend,
    ) -> AppResult<()> {
        require_admin(viewer)?;
        self.offering_mut(product_id)?.image = image.to_string();
        self.persist()?;
        if let Err(e) = backend.patch_product_image(product_id, image).await {
            warn!("Synchronisation de l'image de '{}' échouée: {}", product_id, e);
        }
        Ok(())
    }

    // --- Admin: resources ---

    /// Uploads a PDF and makes it the offering's current resource, in draft.
    pub async fn upload_product_resource(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        backend: &dyn CatalogBackend,
    ) -> AppResult<Resource> {
        require_admin(viewer)?;
        if !utils::looks_like_pdf(file_name, &bytes) {
            return Err(AppError::Upload(format!(
                "'{}' n'est pas un document PDF",
                file_name
            )));
        }
        let previous = self.require_offering(product_id)?.current_resource.clone();
        let state = publication::transition(
            PublicationState::of(previous.as_ref()),
            PublicationAction::Upload,
        )?;
        debug_assert_eq!(state, PublicationState::Draft);

        let file_path = utils::object_path(backend.storage_bucket(), product_id, file_name);
        let file_size = utils::human_size(bytes.len() as u64);
        backend
            .upload_object(&file_path, bytes, "application/pdf")
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        let version = publication::next_version(previous.as_ref());
        let resource = Resource {
            id: format!("res_{}_v{}", product_id, version),
            product_id: product_id.to_string(),
            file_name: file_name.to_string(),
            file_path,
            file_size,
            status: ResourceStatus::Draft,
            version,
            last_updated: Utc::now(),
        };
        self.offering_mut(product_id)?.current_resource = Some(resource.clone());
        self.persist()?;
        info!(
            "Ressource '{}' v{} déposée pour '{}' (brouillon)",
            resource.file_name, resource.version, product_id
        );
        Ok(resource)
    }

    /// Explicit admin toggle between draft and published.
    pub fn set_resource_status(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        status: ResourceStatus,
    ) -> AppResult<ResourceStatus> {
        require_admin(viewer)?;
        let offering = self.offering_mut(product_id)?;
        let Some(resource) = offering.current_resource.as_mut() else {
            return Err(AppError::NotFound(format!(
                "aucune ressource pour '{}'",
                product_id
            )));
        };
        let current = PublicationState::of(Some(resource));
        if let Some(action) = publication::action_for_target(current, status)? {
            publication::transition(current, action)?;
            resource.status = status;
            resource.last_updated = Utc::now();
            info!("Ressource de '{}' -> {:?}", product_id, status);
            self.persist()?;
        }
        Ok(status)
    }

    // --- Admin: course content ---

    /// Appends a draft module, creating the course if the offering has none yet.
    pub fn add_module(&mut self, viewer: &Viewer, product_id: &str, title: &str) -> AppResult<String> {
        require_admin(viewer)?;
        self.require_offering(product_id)?;
        let course = self
            .courses
            .entry(product_id.to_string())
            .or_insert_with(|| Course::empty(product_id));
        let id = utils::unique_id("mod", course.modules.iter().map(|m| m.id.as_str()));
        course.modules.push(Module {
            id: id.clone(),
            title: title.to_string(),
            status: ResourceStatus::Draft,
            lessons: Vec::new(),
        });
        self.persist()?;
        Ok(id)
    }

    /// Appends a draft lesson. Returns `None` when the course or module does not exist.
    pub fn add_lesson(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        module_id: &str,
        draft: LessonDraft,
    ) -> AppResult<Option<String>> {
        require_admin(viewer)?;
        let Some(course) = self.courses.get_mut(product_id) else {
            return Ok(None);
        };
        let existing: Vec<String> = course
            .modules
            .iter()
            .flat_map(|m| m.lessons.iter().map(|l| l.id.clone()))
            .collect();
        let Some(module) = course.modules.iter_mut().find(|m| m.id == module_id) else {
            return Ok(None);
        };
        let id = utils::unique_id("les", existing.iter().map(String::as_str));
        module.lessons.push(Lesson {
            id: id.clone(),
            title: draft.title,
            duration: draft.duration,
            video_url: draft.video_url,
            provider: draft.provider,
            status: ResourceStatus::Draft,
            description: draft.description,
            checklist: draft.checklist,
        });
        self.persist()?;
        Ok(Some(id))
    }

    pub fn update_lesson_status(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        module_id: &str,
        lesson_id: &str,
        status: ResourceStatus,
    ) -> AppResult<bool> {
        self.update_lesson(viewer, product_id, module_id, lesson_id, |lesson| {
            lesson.status = status;
        })
    }

    pub fn update_lesson_details(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        module_id: &str,
        lesson_id: &str,
        update: &LessonUpdate,
    ) -> AppResult<bool> {
        self.update_lesson(viewer, product_id, module_id, lesson_id, |lesson| {
            update.apply_to(lesson);
        })
    }

    pub fn update_module_status(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        module_id: &str,
        status: ResourceStatus,
    ) -> AppResult<bool> {
        require_admin(viewer)?;
        let found = self
            .courses
            .get_mut(product_id)
            .and_then(|c| c.modules.iter_mut().find(|m| m.id == module_id))
            .map(|module| module.status = status)
            .is_some();
        if found {
            self.persist()?;
        }
        Ok(found)
    }

    fn update_lesson(
        &mut self,
        viewer: &Viewer,
        product_id: &str,
        module_id: &str,
        lesson_id: &str,
        apply: impl FnOnce(&mut Lesson),
    ) -> AppResult<bool> {
        require_admin(viewer)?;
        let lesson = self
            .courses
            .get_mut(product_id)
            .and_then(|c| c.modules.iter_mut().find(|m| m.id == module_id))
            .and_then(|m| m.lessons.iter_mut().find(|l| l.id == lesson_id));
        let Some(lesson) = lesson else {
            return Ok(false);
        };
        apply(lesson);
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> AppResult<()> {
        let snapshot = CatalogSnapshot {
            offerings: self.offerings.clone(),
            courses: self.courses.clone(),
        };
        storage::save_json(self.store.as_ref(), keys::CATALOG, &snapshot)
    }
}

pub fn require_admin(viewer: &Viewer) -> AppResult<()> {
    if viewer.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "action réservée aux administrateurs".to_string(),
        ))
    }
}

// --- Built-in catalog ---

fn resource(
    product_id: &str,
    id: &str,
    file_name: &str,
    file_path: &str,
    file_size: &str,
    status: ResourceStatus,
    version: u32,
    last_updated: &str,
) -> Option<Resource> {
    let last_updated = DateTime::parse_from_rfc3339(last_updated)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default();
    Some(Resource {
        id: id.to_string(),
        product_id: product_id.to_string(),
        file_name: file_name.to_string(),
        file_path: file_path.to_string(),
        file_size: file_size.to_string(),
        status,
        version,
        last_updated,
    })
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn compat(valid: &[&str], invalid: &[&str]) -> Option<Compatibility> {
    Some(Compatibility {
        valid: strings(valid),
        invalid: strings(invalid),
    })
}

/// Catalog used when the backend has no products or cannot be reached.
pub fn fallback_offerings() -> Vec<Offering> {
    vec![
        Offering {
            id: "p1_door_slammed".into(),
            title: "Urgence : Porte Claquée".into(),
            description: "Un plan structuré pour analyser une porte claquée, comprendre les techniques professionnelles d’ouverture fine et éviter les erreurs irréversibles.".into(),
            price: 100,
            original_price: Some(500),
            features: strings(&[
                "Vidéo HD : technique professionnelle sans perçage",
                "PDF Diagnostic : vérifier si la porte est réellement claquée",
                "Guide pratique : gestes autorisés / gestes interdits",
                "Assistance WhatsApp incluse (validation ou STOP immédiat)",
            ]),
            compatibility: compat(
                &["Porte claquée (non verrouillée)", "Porte blindée claquée sans verrouillage"],
                &["Porte fermée à clé (verrouillée)"],
            ),
            product_type: ProductType::Bundle,
            image: "/images/p1.jpg".into(),
            stripe_price_id: Some("price_1PqXyZA2eZvKYlo2kR9uWq5a".into()),
            current_resource: resource(
                "p1_door_slammed",
                "res_p1_v1",
                "Guide_Ouverture_Radio_Pro_v1.pdf",
                "secure-pdfs/p1/guide.pdf",
                "2.4 MB",
                ResourceStatus::Published,
                1,
                "2023-11-15T10:00:00Z",
            ),
        },
        Offering {
            id: "p2_key_broken".into(),
            title: "Clé Cassée dans le Barillet".into(),
            description: "Formation vidéo pour comprendre comment tenter une extraction sécurisée du fragment cassé, sans aggraver le blocage.".into(),
            price: 100,
            original_price: Some(500),
            features: strings(&[
                "Vidéo HD : protocole d’extraction sécurisé",
                "Guide PDF : cas autorisés / cas interdits",
                "Section “STOP” : quand ne surtout pas insister",
                "Assistance WhatsApp incluse (validation sur photo)",
            ]),
            compatibility: compat(
                &["Clé cassée visible ou accessible"],
                &["Cylindre bloqué ou endommagé", "Tentative déjà forcée"],
            ),
            product_type: ProductType::Bundle,
            image: "/images/p2.jpg".into(),
            stripe_price_id: Some("price_1PqXzQB2eZvKYlo2mL8vTq4b".into()),
            current_resource: resource(
                "p2_key_broken",
                "res_p2_v1_draft",
                "Guide_Extraction_Key_DRAFT.pdf",
                "secure-pdfs/p2/draft.pdf",
                "1.8 MB",
                ResourceStatus::Draft,
                1,
                "2023-12-20T14:30:00Z",
            ),
        },
        Offering {
            id: "p3_cylinder_replace".into(),
            title: "Remplacer son Cylindre".into(),
            description: "Tutoriel technique pour changer un cylindre standard sans erreur de mesure ni main-d’œuvre excessive.".into(),
            price: 100,
            original_price: Some(500),
            features: strings(&[
                "Tutoriel vidéo : démontage sécurisé",
                "PDF mesures exactes (intérieur / extérieur)",
                "Checklist outils nécessaires (basiques)",
                "Assistance WhatsApp en cas de doute",
            ]),
            compatibility: compat(&["Cylindre standard"], &["Serrure spécifique ou système complexe"]),
            product_type: ProductType::Video,
            image: "/images/p3.jpg".into(),
            stripe_price_id: Some("price_1PqY1RC2eZvKYlo2nN7wUr3c".into()),
            current_resource: None,
        },
        Offering {
            id: "p4_security_pack".into(),
            title: "Changer sa Serrure Complète".into(),
            description: "Formation complète pour remplacer une serrure entière sans main-d’œuvre professionnelle.".into(),
            price: 100,
            original_price: Some(500),
            features: strings(&[
                "Mesure précise avant achat",
                "Démontage & remontage pas à pas (Vidéo)",
                "Guide d’achat : critères A2P (sans marque imposée)",
                "Assistance WhatsApp incluse",
            ]),
            compatibility: compat(&["Remplacement simple"], &["Travaux lourds ou structurels"]),
            product_type: ProductType::Bundle,
            image: "/images/p4.jpg".into(),
            stripe_price_id: Some("price_1PqY2SD2eZvKYlo2oP6xVs2d".into()),
            current_resource: resource(
                "p4_security_pack",
                "res_p4_v2",
                "Tuto_Remplacement_Serrure_v2.pdf",
                "secure-pdfs/p4/guide.pdf",
                "3.1 MB",
                ResourceStatus::Published,
                2,
                "2023-10-05T09:00:00Z",
            ),
        },
        Offering {
            id: "p5_audit_security".into(),
            title: "Audit Sécurité & Renforcement".into(),
            description: "Méthodologie professionnelle pour évaluer vos vulnérabilités et prioriser les renforcements efficaces sans travaux lourds.".into(),
            price: 100,
            original_price: Some(500),
            features: strings(&[
                "Audit guidé (photos + questionnaire)",
                "Plan d’action priorisé (24h / 7j / 30j)",
                "Budget maîtrisé & erreurs à éviter",
                "Assistance WhatsApp de validation",
            ]),
            compatibility: compat(&["Logement ou local standard"], &["Travaux de blindage structurel"]),
            product_type: ProductType::Bundle,
            image: "/images/p5.jpg".into(),
            stripe_price_id: Some("price_1PqY3TE2eZvKYlo2qR5yWt1e".into()),
            current_resource: None,
        },
        Offering {
            id: "p6_survival_kit".into(),
            title: "Pack : Kit de Prévention".into(),
            description: "Sélection professionnelle du matériel indispensable pour gérer les situations courantes sans stress.".into(),
            price: 29,
            original_price: Some(145),
            features: strings(&[
                "Liens d’achat directs (qualité pro)",
                "Matériel réellement utile (pas de gadgets)",
                "Économie immédiate",
            ]),
            compatibility: None,
            product_type: ProductType::Bundle,
            image: "/images/p6.jpg".into(),
            stripe_price_id: Some("price_1PqY4UF2eZvKYlo2rS4zXu0f".into()),
            current_resource: resource(
                "p6_survival_kit",
                "res_p6_kit",
                "Liste_Materiel_Pro.pdf",
                "secure-pdfs/p6/list.pdf",
                "0.5 MB",
                ResourceStatus::Published,
                1,
                "2023-09-01T12:00:00Z",
            ),
        },
    ]
}

fn lesson(
    id: &str,
    title: &str,
    duration: &str,
    status: ResourceStatus,
    description: &str,
    checklist: &[&str],
) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: title.to_string(),
        duration: duration.to_string(),
        video_url: "https://www.w3schools.com/html/mov_bbb.mp4".to_string(),
        provider: VideoProvider::Native,
        status,
        description: Some(description.to_string()),
        checklist: (!checklist.is_empty()).then(|| strings(checklist)),
    }
}

/// Course content shipped with the built-in catalog.
pub fn seed_courses() -> BTreeMap<String, Course> {
    use ResourceStatus::{Draft, Published};
    let door_slammed = Course {
        product_id: "p1_door_slammed".into(),
        modules: vec![
            Module {
                id: "m1_safety".into(),
                title: "Module 1 : Analyse & Sécurité (OBLIGATOIRE)".into(),
                status: Published,
                lessons: vec![
                    lesson(
                        "l1_intro",
                        "STOP - Diagnostic immédiat",
                        "02:15",
                        Published,
                        "Ne touchez à rien avant d'avoir vérifié ces 3 points cruciaux pour ne pas aggraver la situation.",
                        &[
                            "Vérifier que la porte n'est pas verrouillée",
                            "Vérifier l'état de la poignée",
                            "S'assurer d'être le locataire/propriétaire",
                        ],
                    ),
                    lesson(
                        "l2_legal",
                        "Cadre légal & Responsabilité",
                        "01:45",
                        Published,
                        "Rappel rapide de vos droits et devoirs avant d'intervenir.",
                        &[],
                    ),
                ],
            },
            Module {
                id: "m2_technique".into(),
                title: "Module 2 : La Technique Radio".into(),
                status: Published,
                lessons: vec![
                    lesson(
                        "l3_tools",
                        "Préparer votre outil (Radio ou Bouteille)",
                        "03:30",
                        Published,
                        "Comment préparer l'outil adapté avant toute intervention.",
                        &["Découpe propre sans bavure", "Taille idéale : 15cm x 10cm"],
                    ),
                    lesson(
                        "l4_gesture",
                        "Le Geste : Angle et Vibration",
                        "05:10",
                        Published,
                        "Le mouvement exact, position des mains comprise.",
                        &[],
                    ),
                    lesson(
                        "l5_double",
                        "Cas particulier : Double feuillure",
                        "04:00",
                        Draft,
                        "La technique adaptée pour les portes blindées ou modernes avec décrochement.",
                        &[],
                    ),
                ],
            },
            Module {
                id: "m3_troubleshoot".into(),
                title: "Module 3 : En cas d'échec".into(),
                status: Published,
                lessons: vec![
                    lesson(
                        "l6_errors",
                        "Les 3 erreurs qui bloquent tout",
                        "02:50",
                        Published,
                        "Si ça ne s'ouvre pas, c'est probablement à cause de l'un de ces détails.",
                        &[],
                    ),
                    lesson(
                        "l7_abandon",
                        "Quand faut-il abandonner ?",
                        "01:30",
                        Published,
                        "Savoir s'arrêter avant de casser la serrure.",
                        &[],
                    ),
                ],
            },
        ],
    };
    BTreeMap::from([(door_slammed.product_id.clone(), door_slammed)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountStatus, Role};
    use crate::storage::MemoryStore;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeBackend {
        products: Vec<Offering>,
        fail: bool,
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CatalogBackend for FakeBackend {
        async fn fetch_products(&self) -> AppResult<Vec<Offering>> {
            if self.fail {
                return Err(AppError::Other(anyhow::anyhow!("offline")));
            }
            Ok(self.products.clone())
        }
        async fn patch_product(&self, _: &str, _: &OfferingUpdate) -> AppResult<()> {
            Err(AppError::Other(anyhow::anyhow!("offline")))
        }
        async fn patch_product_image(&self, _: &str, _: &str) -> AppResult<()> {
            Ok(())
        }
        async fn upload_object(&self, path: &str, _: Vec<u8>, _: &str) -> AppResult<()> {
            self.uploads.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    fn admin() -> Viewer {
        Viewer {
            id: "u5".into(),
            email: "admin@test.com".into(),
            name: "Admin".into(),
            role: Role::Admin,
            status: AccountStatus::Active,
            purchased_product_ids: vec![],
            joined_at: None,
        }
    }

    fn customer() -> Viewer {
        Viewer::synthesized("u1", "client@test.com", vec!["p1_door_slammed".into()])
    }

    fn catalog() -> CatalogStore {
        CatalogStore::load(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn builtin_catalog_has_six_offerings_and_one_course() {
        let catalog = catalog();
        assert_eq!(catalog.offerings().len(), 6);
        assert_eq!(catalog.course("p1_door_slammed").unwrap().lesson_count(), 7);
        assert!(catalog.course("p3_cylinder_replace").is_none());
    }

    #[tokio::test]
    async fn remote_rows_replace_offerings_but_keep_local_resources() {
        let mut catalog = catalog();
        let mut remote = catalog.offering("p1_door_slammed").unwrap().clone();
        remote.current_resource = None;
        remote.title = "Titre distant".into();
        let backend = FakeBackend {
            products: vec![remote],
            ..Default::default()
        };
        assert!(catalog.refresh_from_remote(&backend).await);
        assert_eq!(catalog.offerings().len(), 1);
        let p1 = catalog.offering("p1_door_slammed").unwrap();
        assert_eq!(p1.title, "Titre distant");
        assert!(p1.current_resource.is_some());
    }

    #[tokio::test]
    async fn remote_failure_keeps_the_fallback() {
        let mut catalog = catalog();
        let backend = FakeBackend {
            fail: true,
            ..Default::default()
        };
        assert!(!catalog.refresh_from_remote(&backend).await);
        assert_eq!(catalog.offerings().len(), 6);
    }

    #[tokio::test]
    async fn upload_rejects_non_pdf_and_versions_reuploads() {
        let mut catalog = catalog();
        let backend = FakeBackend::default();
        let err = catalog
            .upload_product_resource(&admin(), "p4_security_pack", "photo.png", vec![0x89, b'P'], &backend)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upload(_)));

        let resource = catalog
            .upload_product_resource(
                &admin(),
                "p4_security_pack",
                "Tuto v3.pdf",
                b"%PDF-1.7 body".to_vec(),
                &backend,
            )
            .await
            .unwrap();
        assert_eq!(resource.status, ResourceStatus::Draft);
        assert_eq!(resource.version, 3);
        assert_eq!(
            backend.uploads.lock().unwrap().as_slice(),
            ["secure-pdfs/p4_security_pack/Tuto v3.pdf"]
        );
    }

    #[tokio::test]
    async fn failed_remote_patch_keeps_local_edit() {
        let mut catalog = catalog();
        let update = OfferingUpdate {
            price: Some(120),
            ..Default::default()
        };
        catalog
            .update_product_details(&admin(), "p3_cylinder_replace", &update, &FakeBackend::default())
            .await
            .unwrap();
        assert_eq!(catalog.offering("p3_cylinder_replace").unwrap().price, 120);
    }

    #[test]
    fn customers_cannot_edit_the_catalog() {
        let mut catalog = catalog();
        let err = catalog
            .set_resource_status(&customer(), "p2_key_broken", ResourceStatus::Published)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn resource_toggle_flips_status_and_persists() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut catalog = CatalogStore::load(store.clone());
        catalog
            .set_resource_status(&admin(), "p2_key_broken", ResourceStatus::Published)
            .unwrap();
        let reloaded = CatalogStore::load(store);
        let status = reloaded
            .offering("p2_key_broken")
            .and_then(|o| o.current_resource.as_ref())
            .map(|r| r.status);
        assert_eq!(status, Some(ResourceStatus::Published));
    }

    #[test]
    fn new_modules_and_lessons_start_as_drafts() {
        let mut catalog = catalog();
        let module_id = catalog
            .add_module(&admin(), "p3_cylinder_replace", "Module 1 : Mesures")
            .unwrap();
        let lesson_id = catalog
            .add_lesson(
                &admin(),
                "p3_cylinder_replace",
                &module_id,
                LessonDraft {
                    title: "Mesurer le cylindre".into(),
                    duration: "03:00".into(),
                    video_url: "https://vimeo.com/1".into(),
                    provider: VideoProvider::Vimeo,
                    description: None,
                    checklist: None,
                },
            )
            .unwrap()
            .unwrap();
        let course = catalog.course("p3_cylinder_replace").unwrap();
        assert_eq!(course.modules[0].status, ResourceStatus::Draft);
        assert_eq!(course.modules[0].lessons[0].id, lesson_id);
        assert_eq!(course.modules[0].lessons[0].status, ResourceStatus::Draft);

        assert!(
            catalog
                .update_lesson_status(&admin(), "p3_cylinder_replace", &module_id, &lesson_id, ResourceStatus::Published)
                .unwrap()
        );
        assert_eq!(
            catalog
                .add_lesson(
                    &admin(),
                    "p5_audit_security",
                    "m1",
                    LessonDraft {
                        title: "x".into(),
                        duration: "1".into(),
                        video_url: "u".into(),
                        provider: VideoProvider::Native,
                        description: None,
                        checklist: None,
                    },
                )
                .unwrap(),
            None
        );
    }
}
