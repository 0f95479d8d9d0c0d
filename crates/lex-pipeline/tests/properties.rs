//! Grounding properties over random support patterns

use lex_core::citation::extract_citations;
use lex_core::text::contains_normalized;
use lex_core::citation::marker;
use lex_core::{
    Claim, ClaimId, ClaimRole, DraftSection, DrafterOutput, FuenteId, FuenteOficial, GuardrailCheck, HeadingLevel,
    MissingElement, RenderOrigin, Section, SectionId, SourceCatalog, SourceKind,
};
use lex_pipeline::defaults::RubricScorer;
use lex_pipeline::collaborators::PlanProposal;
use lex_pipeline::verifier::{CitasResueltas, Guardrail, SinPii, VerificationContext};
use lex_pipeline::{
    CancelToken, Collaborators, PatternRedactor, PipelineResponse, Retriever, ToolRegistry, Verifier,
};
use lex_test_utils::{caller, doc_for, fast_config, pipeline_with, proposed, request, ScriptedPlanModel, StubFetcher};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Norm-backed claims resolve; ruling-backed claims never do.
fn proposal_for(pattern: &[(bool, bool)]) -> PlanProposal {
    let outline = (1..=pattern.len())
        .map(|i| Section::new(format!("S{i}"), HeadingLevel::H2, format!("Sección {i}")))
        .collect();
    let claims = pattern
        .iter()
        .enumerate()
        .map(|(i, (supported, principal))| {
            let kind = if *supported { SourceKind::Norma } else { SourceKind::Jurisprudencia };
            let rol = if *principal { ClaimRole::Principal } else { ClaimRole::Apoyo };
            proposed(&claim_text(i), &format!("S{}", i + 1), rol, &[kind])
        })
        .collect();
    PlanProposal {
        titulo: "Memorando".into(),
        outline,
        claims,
    }
}

fn fetcher() -> StubFetcher {
    StubFetcher::complete().without(SourceKind::Jurisprudencia)
}

fn run(pattern: &[(bool, bool)]) -> PipelineResponse {
    let collaborators = Collaborators::offline(Arc::new(fetcher()))
        .with_plan_model(Arc::new(ScriptedPlanModel::new(proposal_for(pattern))));
    let pipeline = pipeline_with(fast_config(), collaborators);
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(pipeline.run(&request(), &caller(), &CancelToken::new()))
        .unwrap()
}

fn claim_text(i: usize) -> String {
    format!("Afirmación número {} sobre la culpa y el daño", i + 1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_no_dangling_citations(pattern in prop::collection::vec((any::<bool>(), any::<bool>()), 1..6)) {
        let response = run(&pattern);
        let retrieval = response.retriever.as_ref().unwrap();
        for id in extract_citations(&response.texto_final) {
            prop_assert!(retrieval.fuentes.contains(&id));
        }
    }

    #[test]
    fn prop_unsupported_text_never_appears(pattern in prop::collection::vec((any::<bool>(), any::<bool>()), 1..6)) {
        let response = run(&pattern);
        for (i, (supported, _)) in pattern.iter().enumerate() {
            prop_assert_eq!(contains_normalized(&response.texto_final, &claim_text(i)), *supported);
        }
    }

    #[test]
    fn prop_trazabilidad_lists_exactly_cited_sources(pattern in prop::collection::vec((any::<bool>(), any::<bool>()), 1..6)) {
        let response = run(&pattern);
        let cited: BTreeSet<String> = extract_citations(&response.texto_final).iter().map(ToString::to_string).collect();
        let traced: BTreeSet<String> = response.finalizer.trazabilidad.fuentes.iter().map(|f| f.id.to_string()).collect();
        prop_assert_eq!(cited, traced);
    }

    #[test]
    fn prop_complete_iff_every_section_grounded(pattern in prop::collection::vec((any::<bool>(), any::<bool>()), 1..6)) {
        // One claim per section, so an unsupported claim of either role leaves its section caveated.
        let response = run(&pattern);
        let all_supported = pattern.iter().all(|(s, _)| *s);
        prop_assert_eq!(response.is_complete(), all_supported);
        let faltantes = response.finalizer.completion.faltantes();
        for (i, (supported, _)) in pattern.iter().enumerate() {
            let seccion = SectionId::new(format!("S{}", i + 1));
            let listed = faltantes.iter().any(|m| matches!(m, MissingElement::Claim { seccion: s, .. } if *s == seccion));
            prop_assert_eq!(listed, !*supported);
        }
    }
}

struct Always(bool);

impl Guardrail for Always {
    fn nombre(&self) -> &'static str {
        if self.0 { "siempre_pasa" } else { "siempre_falla" }
    }

    fn check(&self, _: &VerificationContext<'_>) -> GuardrailCheck {
        if self.0 {
            GuardrailCheck::pass(self.nombre(), "ok")
        } else {
            GuardrailCheck::fail(self.nombre(), "regla adicional incumplida")
        }
    }
}

fn verify_with(response: &PipelineResponse, extra: Vec<Arc<dyn Guardrail>>) -> bool {
    let config = Arc::new(fast_config());
    let verifier = extra
        .into_iter()
        .fold(Verifier::new(Arc::new(RubricScorer::default()), config), Verifier::with_guardrail);
    let plan = response.planner.as_ref().unwrap();
    let retrieval = response.retriever.as_ref().unwrap();
    let claims: Vec<Claim> = plan
        .claims
        .iter()
        .map(|c| c.clone().resolve(&retrieval.result_for(c.id()).unwrap().resolucion))
        .collect();
    let request = request();
    let ctx = VerificationContext {
        request: &request,
        draft: response.drafter.as_ref().unwrap(),
        claims: &claims,
        fuentes: &retrieval.fuentes,
    };
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(verifier.verify(&ctx, &CancelToken::new()))
        .unwrap()
        .aprobado
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_adding_guardrails_never_approves_more(
        pattern in prop::collection::vec((any::<bool>(), any::<bool>()), 1..5),
        extras in prop::collection::vec(any::<bool>(), 0..3),
    ) {
        let response = run(&pattern);
        let base = verify_with(&response, vec![]);
        let extended = verify_with(
            &response,
            extras.iter().map(|p| Arc::new(Always(*p)) as Arc<dyn Guardrail>).collect(),
        );
        prop_assert!(!extended || base);
        if extras.iter().any(|p| !*p) {
            prop_assert!(!extended);
        }
    }
}

const FILLER: &[&str] = &[
    "daño", "culpa", "norma", "sala", "reparación", "indemnización", "contrato", "hecho", "nexo", "prueba",
    "perjuicio", "conducta", "víctima", "responsable", "obligación",
];

fn resident_catalog() -> SourceCatalog {
    let mut catalog = SourceCatalog::new();
    for kind in SourceKind::ALL {
        let doc = doc_for(kind);
        let texto = doc.texto.clone();
        catalog.insert(FuenteOficial::from_redacted(kind, doc, texto));
    }
    catalog
}

fn draft_citing(catalog: &SourceCatalog, frases: &[(Vec<usize>, Vec<bool>)]) -> DrafterOutput {
    let ids: Vec<FuenteId> = catalog.iter().map(|f| f.id().clone()).collect();
    let texto = frases
        .iter()
        .map(|(words, pick)| {
            let cuerpo: Vec<&str> = words.iter().map(|w| FILLER[*w]).collect();
            let citas: String = ids
                .iter()
                .zip(pick)
                .filter(|(_, p)| **p)
                .map(|(id, _)| format!(" {}", marker(id)))
                .collect();
            format!("{}{citas}.", cuerpo.join(" "))
        })
        .collect::<Vec<_>>()
        .join(" ");
    DrafterOutput {
        texto_completo: format!("# Memorando\n\n## Análisis\n\n{texto}\n"),
        secciones: vec![DraftSection {
            id: SectionId::new("S1"),
            titulo: "Análisis".into(),
            nivel: HeadingLevel::H2,
            fuentes_citadas: extract_citations(&texto).into_iter().collect(),
            claims_usados: vec![],
            texto,
            advertencia: false,
            origen: RenderOrigin::Plantilla,
        }],
        claims_excluidos: vec![],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_resolved_citations_and_clean_text_pass_guardrails(
        frases in prop::collection::vec(
            (
                prop::collection::vec(0..FILLER.len(), 1..12),
                prop::collection::vec(any::<bool>(), SourceKind::ALL.len()),
            ),
            0..6,
        ),
    ) {
        let catalog = resident_catalog();
        let draft = draft_citing(&catalog, &frases);
        let request = request();
        let ctx = VerificationContext {
            request: &request,
            draft: &draft,
            claims: &[],
            fuentes: &catalog,
        };
        let citas = CitasResueltas.check(&ctx);
        let pii = SinPii.check(&ctx);
        prop_assert!(citas.passed, "{}", citas.detalle);
        prop_assert!(pii.passed, "{}", pii.detalle);
    }
}

#[tokio::test]
async fn test_retriever_is_idempotent() {
    let claims: Vec<Claim> = [SourceKind::Norma, SourceKind::Jurisprudencia, SourceKind::Doctrina]
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let p = proposed(&claim_text(i), "S1", ClaimRole::Principal, &[*kind]);
            Claim::new(ClaimId::sequential(i + 1), p.texto, SectionId::new("S1"), p.rol, p.required_sources).unwrap()
        })
        .collect();
    let retriever = Retriever::new(
        Arc::new(ToolRegistry::with_fetcher_for_all(Arc::new(fetcher()))),
        Arc::new(PatternRedactor::new()),
        Arc::new(fast_config()),
    );

    let first = retriever.resolve(&claims, &CancelToken::new()).await;
    let second = retriever.resolve(&claims, &CancelToken::new()).await;
    assert_eq!(first, second);
    assert_eq!(first.supported_count(), 2);
}
