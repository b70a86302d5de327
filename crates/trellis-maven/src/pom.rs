//! POM reading: declared dependencies, dependency management, parent
//! reference and `${property}` interpolation.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use trellis_util::errors::{TrellisError, TrellisResult};

const MAX_INTERPOLATION_PASSES: usize = 20;

/// The parts of a POM that matter for dependency resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// A `<dependency>` element, either declared or managed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    /// `(groupId, artifactId)`; `*` stands for any.
    pub exclusions: Vec<(String, String)>,
}

impl PomDependency {
    fn is_same_module(&self, other: &PomDependency) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }

    /// `<scope>import</scope>` with `<type>pom</type>`.
    pub fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some("import") && self.type_.as_deref() == Some("pom")
    }

    fn interpolated(&self, pom: &Pom) -> Self {
        Self {
            group_id: pom.interpolate(&self.group_id),
            artifact_id: pom.interpolate(&self.artifact_id),
            version: self.version.as_deref().map(|v| pom.interpolate(v)),
            scope: self.scope.as_deref().map(|s| pom.interpolate(s)),
            classifier: self.classifier.as_deref().map(|c| pom.interpolate(c)),
            type_: self.type_.as_deref().map(|t| pom.interpolate(t)),
            ..self.clone()
        }
    }
}

impl Pom {
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Replace `${...}` references by POM properties or project fields.
    /// Unknown references are left as they are.
    pub fn interpolate(&self, input: &str) -> String {
        let mut result = input.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            let Some(start) = result.find("${") else {
                break;
            };
            let Some(len) = result[start..].find('}') else {
                break;
            };
            let key = &result[start + 2..start + len];
            let Some(value) = self.property(key) else {
                break;
            };
            result = format!("{}{}{}", &result[..start], value, &result[start + len + 1..]);
        }
        result
    }

    fn property(&self, key: &str) -> Option<String> {
        let key = key.strip_prefix("pom.").map_or_else(
            || key.to_string(),
            |rest| format!("project.{rest}"),
        );
        match key.as_str() {
            "project.groupId" => self.effective_group_id().map(str::to_string),
            "project.artifactId" => self.artifact_id.clone(),
            "project.version" => self.effective_version().map(str::to_string),
            "project.packaging" => self.packaging.clone(),
            "project.parent.groupId" => self.parent.as_ref().map(|p| p.group_id.clone()),
            "project.parent.version" => self.parent.as_ref().map(|p| p.version.clone()),
            other => self.properties.get(other).cloned(),
        }
    }

    /// Take over what this POM inherits from `parent`: properties, group,
    /// version, managed versions and dependencies it doesn't redeclare.
    pub fn inherit(&mut self, parent: &Pom) {
        for (key, value) in &parent.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        if self.group_id.is_none() {
            self.group_id = parent.effective_group_id().map(str::to_string);
        }
        if self.version.is_none() {
            self.version = parent.effective_version().map(str::to_string);
        }
        for managed in &parent.dependency_management {
            if !self.dependency_management.iter().any(|d| d.is_same_module(managed)) {
                self.dependency_management.push(managed.clone());
            }
        }
        for dep in &parent.dependencies {
            if !self.dependencies.iter().any(|d| d.is_same_module(dep)) {
                self.dependencies.push(dep.clone());
            }
        }
    }

    /// Interpolate every dependency field against this POM's properties.
    pub fn interpolated(&self) -> Self {
        Self {
            dependencies: self.dependencies.iter().map(|d| d.interpolated(self)).collect(),
            dependency_management: self
                .dependency_management
                .iter()
                .map(|d| d.interpolated(self))
                .collect(),
            ..self.clone()
        }
    }

    pub fn bom_imports(&self) -> impl Iterator<Item = &PomDependency> {
        self.dependency_management.iter().filter(|d| d.is_bom_import())
    }

    pub fn managed_versions(&self) -> impl Iterator<Item = &PomDependency> {
        self.dependency_management
            .iter()
            .filter(|d| !d.is_bom_import() && d.version.is_some())
    }
}

/// Where the reader currently is, for the elements it collects.
enum Scope {
    Project,
    Parent(ParentRef),
    Dependency { managed: bool, dep: PomDependency },
    Exclusion { managed: bool, dep: PomDependency, exclusion: (String, String) },
}

pub fn parse_pom(xml: &str) -> TrellisResult<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut scope = Scope::Project;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TrellisError::parse(format!("Malformed POM: {e}")))?;
        match event {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                text.clear();
                match path_of(&path).as_str() {
                    "project>parent" => scope = Scope::Parent(ParentRef::default()),
                    "project>dependencies>dependency" => {
                        scope = Scope::Dependency {
                            managed: false,
                            dep: PomDependency::default(),
                        }
                    }
                    "project>dependencyManagement>dependencies>dependency" => {
                        scope = Scope::Dependency {
                            managed: true,
                            dep: PomDependency::default(),
                        }
                    }
                    p if p.ends_with(">exclusions>exclusion") => {
                        if let Scope::Dependency { managed, dep } =
                            std::mem::replace(&mut scope, Scope::Project)
                        {
                            scope = Scope::Exclusion {
                                managed,
                                dep,
                                exclusion: (String::new(), String::new()),
                            };
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                text = e
                    .unescape()
                    .map_err(|e| TrellisError::parse(format!("Malformed POM text: {e}")))?
                    .into_owned();
            }
            Event::End(_) => {
                let element = path.last().map(String::as_str).unwrap_or_default();
                let depth = path.len();
                match &mut scope {
                    Scope::Project if depth == 2 => match element {
                        "groupId" => pom.group_id = Some(text.clone()),
                        "artifactId" => pom.artifact_id = Some(text.clone()),
                        "version" => pom.version = Some(text.clone()),
                        "packaging" => pom.packaging = Some(text.clone()),
                        _ => {}
                    },
                    Scope::Project if depth == 3 && path[1] == "properties" => {
                        pom.properties.insert(element.to_string(), text.clone());
                    }
                    Scope::Project => {}
                    Scope::Parent(parent) => match element {
                        "groupId" => parent.group_id = text.clone(),
                        "artifactId" => parent.artifact_id = text.clone(),
                        "version" => parent.version = text.clone(),
                        "parent" => {
                            if let Scope::Parent(parent) =
                                std::mem::replace(&mut scope, Scope::Project)
                            {
                                pom.parent = Some(parent);
                            }
                        }
                        _ => {}
                    },
                    Scope::Dependency { managed, dep } => match element {
                        "groupId" => dep.group_id = text.clone(),
                        "artifactId" => dep.artifact_id = text.clone(),
                        "version" => dep.version = Some(text.clone()),
                        "scope" => dep.scope = Some(text.clone()),
                        "optional" => dep.optional = text.trim() == "true",
                        "classifier" => dep.classifier = Some(text.clone()),
                        "type" => dep.type_ = Some(text.clone()),
                        "dependency" => {
                            let managed = *managed;
                            let dep = std::mem::take(dep);
                            if managed {
                                pom.dependency_management.push(dep);
                            } else {
                                pom.dependencies.push(dep);
                            }
                            scope = Scope::Project;
                        }
                        _ => {}
                    },
                    Scope::Exclusion { exclusion, .. } => match element {
                        "groupId" => exclusion.0 = text.clone(),
                        "artifactId" => exclusion.1 = text.clone(),
                        "exclusion" => {
                            if let Scope::Exclusion {
                                managed,
                                mut dep,
                                exclusion,
                            } = std::mem::replace(&mut scope, Scope::Project)
                            {
                                dep.exclusions.push(exclusion);
                                scope = Scope::Dependency { managed, dep };
                            }
                        }
                        _ => {}
                    },
                }
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = path.last() {
        return Err(TrellisError::parse(format!("POM ends inside <{open}>")));
    }
    if pom.artifact_id.is_none() {
        return Err(TrellisError::parse("POM has no artifactId"));
    }
    Ok(pom)
}

fn path_of(path: &[String]) -> String {
    path.join(">")
}
