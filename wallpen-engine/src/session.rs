use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};
use wallpen_core::document::{Document, ElementId, ElementRef, Level, TransactionStatus, Wall};
use wallpen_core::geometry::{Arc3, Bounds3D, Line3, Point3, Vector3};
use wallpen_core::penetration::{HitIdentity, ParameterKind, PlannedPlacement, SegmentCategory};

use crate::errors::EngineError;
use crate::host::{
    ElementResolver, FamilyTemplate, ParameterAccessor, ParameterLabels, PlacementHost,
    SourceModel, SourceSegment, TransactionManager,
};

/// 会话中已打开文档的句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(usize);

impl DocumentId {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

/// 宿主应用中打开的文档集合，以及当前活动文档。
#[derive(Debug, Default)]
pub struct Session {
    documents: Vec<Document>,
    active: Option<DocumentId>,
}

#[derive(Debug, Clone, Copy)]
pub struct DemoProject {
    pub architecture: DocumentId,
    pub mechanical: DocumentId,
    pub structure: DocumentId,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开一份文档。第一份打开的文档自动成为活动文档。
    pub fn open(&mut self, document: Document) -> DocumentId {
        let id = DocumentId(self.documents.len());
        debug!(id = id.0, title = document.title(), "打开文档");
        self.documents.push(document);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    pub fn set_active(&mut self, id: DocumentId) -> Result<(), EngineError> {
        if id.0 >= self.documents.len() {
            return Err(EngineError::DocumentNotOpen(id.0));
        }
        self.active = Some(id);
        Ok(())
    }

    #[inline]
    pub fn active(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn document(&self, id: DocumentId) -> Result<&Document, EngineError> {
        self.documents
            .get(id.0)
            .ok_or(EngineError::DocumentNotOpen(id.0))
    }

    pub fn document_mut(&mut self, id: DocumentId) -> Result<&mut Document, EngineError> {
        self.documents
            .get_mut(id.0)
            .ok_or(EngineError::DocumentNotOpen(id.0))
    }

    pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &Document)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(index, document)| (DocumentId(index), document))
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    /// 标题包含 `text` 的第一份文档，`exclude` 指定的文档不参与匹配。
    pub fn find_document_by_title_substring(
        &self,
        text: &str,
        exclude: Option<DocumentId>,
    ) -> Option<DocumentId> {
        self.documents()
            .filter(|(id, _)| Some(*id) != exclude)
            .find(|(_, document)| document.title().contains(text))
            .map(|(id, _)| id)
    }

    pub fn find_document_by_title(&self, title: &str) -> Option<&Document> {
        self.documents
            .iter()
            .find(|document| document.title() == title)
    }

    /// 按族名精确匹配洞口族。
    pub fn find_family_template_by_name(
        &self,
        document: DocumentId,
        name: &str,
    ) -> Option<FamilyTemplate> {
        self.document(document)
            .ok()?
            .family_symbols()
            .find(|symbol| symbol.family_name == name)
            .map(FamilyTemplate::from)
    }

    /// 第一个非模板三维视图。
    pub fn find_3d_view(&self, document: DocumentId) -> Option<ElementId> {
        self.document(document)
            .ok()?
            .views()
            .find(|view| !view.is_template)
            .map(|view| view.id)
    }

    /// 构建一套演示项目：建筑、暖通与结构链接三份文档。
    pub fn populate_demo(&mut self) -> DemoProject {
        let wall_box = |x: f64, thickness: f64| {
            Bounds3D::from_corners(
                Point3::new(x, -6.0, 0.0),
                Point3::new(x + thickness, 6.0, 3.0),
            )
        };

        let mut architecture = Document::new("Корпус 1 - АР");
        let level = architecture.add_level("Уровень 1", 0.0);
        architecture.add_wall("Стена 1", Some(level), wall_box(3.0, 0.2));
        architecture.add_wall("Стена 2", Some(level), wall_box(7.0, 0.25));
        architecture.add_view3d("Шаблон 3D", true);
        architecture.add_view3d("{3D}", false);
        architecture.add_family_symbol("Отверстия", "Прямоугольное", ["Ширина", "Высота"]);
        architecture.add_link("Корпус 1 - КЖ", Vector3::ZERO);

        let mut structure = Document::new("Корпус 1 - КЖ");
        let structure_level = structure.add_level("Отм. 0.000", 0.0);
        structure.add_wall("Монолитная стена", Some(structure_level), wall_box(5.0, 0.3));

        let mut mechanical = Document::new("Корпус 1 - ОВ");
        mechanical.add_duct(
            Line3::new(Point3::new(0.0, 0.0, 1.5), Point3::new(10.0, 0.0, 1.5)),
            0.4,
        );
        mechanical.add_duct(
            Line3::new(Point3::new(0.0, 2.0, 1.5), Point3::new(2.0, 2.0, 1.5)),
            0.25,
        );
        mechanical.add_duct(
            Arc3 {
                start: Point3::new(0.0, 4.0, 2.0),
                mid: Point3::new(4.0, 5.0, 2.0),
                end: Point3::new(8.0, 4.0, 2.0),
            },
            0.3,
        );
        mechanical.add_pipe(
            Line3::new(Point3::new(0.0, -2.0, 2.5), Point3::new(8.0, -2.0, 2.5)),
            0.1,
        );

        let project = DemoProject {
            architecture: self.open(architecture),
            mechanical: self.open(mechanical),
            structure: self.open(structure),
        };
        self.active = Some(project.architecture);

        debug!(
            architecture = project.architecture.0,
            mechanical = project.mechanical.0,
            structure = project.structure.0,
            "已创建演示项目"
        );
        project
    }
}

impl SourceModel for Document {
    fn list_segments(&self, category: SegmentCategory) -> Vec<SourceSegment> {
        self.mep_curves(category)
            .map(|curve| SourceSegment {
                element: curve.id,
                category,
                location: curve.location,
                diameter: curve.diameter,
            })
            .collect()
    }
}

/// 目标文档及其链接文档的只读视图，用于把命中解析回墙与标高。
#[derive(Debug, Clone, Copy)]
pub struct LinkedModel<'a> {
    session: &'a Session,
    target: &'a Document,
}

impl<'a> LinkedModel<'a> {
    pub fn new(session: &'a Session, target: DocumentId) -> Result<Self, EngineError> {
        Ok(Self {
            session,
            target: session.document(target)?,
        })
    }

    fn owner(&self, link: Option<ElementId>) -> Option<&'a Document> {
        match link {
            None => Some(self.target),
            Some(link) => {
                let instance = self.target.link(link)?;
                self.session.find_document_by_title(&instance.linked_title)
            }
        }
    }
}

impl ElementResolver for LinkedModel<'_> {
    fn resolve_wall(&self, identity: HitIdentity) -> Option<&Wall> {
        self.owner(identity.link)?.wall(identity.element)
    }

    fn resolve_level(&self, identity: HitIdentity) -> Option<&Level> {
        let document = self.owner(identity.link)?;
        let wall = document.wall(identity.element)?;
        document.level(wall.level?)
    }
}

/// 可写的目标文档：放置洞口实例、写参数、管理事务。
#[derive(Debug)]
pub struct TargetDocument<'a> {
    document: &'a mut Document,
    labels: &'a ParameterLabels,
}

impl<'a> TargetDocument<'a> {
    pub fn new(document: &'a mut Document, labels: &'a ParameterLabels) -> Self {
        Self { document, labels }
    }
}

impl PlacementHost for TargetDocument<'_> {
    fn create_instance(
        &mut self,
        template: &FamilyTemplate,
        placement: &PlannedPlacement,
    ) -> Result<ElementId, EngineError> {
        if !placement.point.is_finite() {
            return Err(EngineError::InvalidPlacement(format!(
                "non-finite point for source {}",
                placement.source.get()
            )));
        }
        match placement.wall.link {
            None => {
                self.document
                    .wall(placement.wall.element)
                    .ok_or(EngineError::ElementNotFound(placement.wall.element.get()))?;
                self.document
                    .level(placement.level)
                    .ok_or(EngineError::ElementNotFound(placement.level.get()))?;
            }
            Some(link) => {
                self.document
                    .link(link)
                    .ok_or(EngineError::ElementNotFound(link.get()))?;
            }
        }
        // 标高与宿主墙同属一份文档，链接墙的标高 ID 只在链接文档内有效
        let level = ElementRef {
            link: placement.wall.link,
            element: placement.level,
        };
        self.document
            .add_instance(template.symbol, placement.wall, level, placement.point)
            .ok_or(EngineError::ElementNotFound(template.symbol.get()))
    }
}

impl ParameterAccessor for TargetDocument<'_> {
    fn get_scalar(&self, instance: ElementId, kind: ParameterKind) -> Result<f64, EngineError> {
        let label = self.labels.label(kind);
        let placed = self
            .document
            .instance(instance)
            .ok_or(EngineError::ElementNotFound(instance.get()))?;
        placed
            .parameters
            .get(label)
            .copied()
            .ok_or_else(|| EngineError::ParameterNotFound {
                instance: instance.get(),
                label: label.to_string(),
            })
    }

    fn set_scalar(
        &mut self,
        instance: ElementId,
        kind: ParameterKind,
        value: f64,
    ) -> Result<(), EngineError> {
        let label = self.labels.label(kind);
        let placed = self
            .document
            .instance_mut(instance)
            .ok_or(EngineError::ElementNotFound(instance.get()))?;
        let slot = placed
            .parameters
            .get_mut(label)
            .ok_or_else(|| EngineError::ParameterNotFound {
                instance: instance.get(),
                label: label.to_string(),
            })?;
        *slot = value;
        Ok(())
    }
}

impl TransactionManager for TargetDocument<'_> {
    fn transaction<T>(
        &mut self,
        name: &str,
        work: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let snapshot = self.document.snapshot();
        debug!(name, document = self.document.title(), "事务开始");

        match panic::catch_unwind(AssertUnwindSafe(|| work(&mut *self))) {
            Ok(Ok(value)) => {
                self.document
                    .record_transaction(name, TransactionStatus::Committed);
                info!(name, document = self.document.title(), "事务已提交");
                Ok(value)
            }
            Ok(Err(err)) => {
                self.document.restore(snapshot);
                self.document
                    .record_transaction(name, TransactionStatus::RolledBack);
                warn!(name, error = %err, "事务已回滚");
                Err(EngineError::TransactionRolledBack {
                    name: name.to_string(),
                    source: Box::new(err),
                })
            }
            Err(payload) => {
                self.document.restore(snapshot);
                self.document
                    .record_transaction(name, TransactionStatus::RolledBack);
                warn!(name, "事务中发生 panic，已回滚");
                panic::resume_unwind(payload)
            }
        }
    }
}
