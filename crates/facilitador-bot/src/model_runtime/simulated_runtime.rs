//! Model-free backend used when neither the hosted API nor a local model is
//! available. It scans the prompt for a topic and a known place name and
//! replies with a hand-written guide for that topic.

use super::runtime_trait::{BackendKind, LanguageModel};
use crate::context_engine::context_builder::{
    detect_location, ANSWER_MARKER, CONTEXT_MARKER, LOCATION_MARKER, QUESTION_MARKER,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const PENSION_WORDS: &[&str] = &["pensión", "alimentos", "manutención", "hijo", "hija"];
const LABOR_WORDS: &[&str] = &["laboral", "trabajo", "empleador", "jefe", "salario"];
const FACILITATION_WORDS: &[&str] = &["facilitador", "conciliación", "mediación"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedTopic {
    Pension,
    Labor,
    Facilitation,
    General,
}

pub struct SimulatedRuntime {
    delay: Duration,
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

impl SimulatedRuntime {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Compose the reply for a prompt without the artificial delay
    pub fn respond(&self, prompt: &str) -> String {
        let focus = question_focus(prompt);
        let location = detect_location(focus).or_else(|| location_hint(prompt));

        let topic = detect_topic(focus);
        match topic {
            SimulatedTopic::Pension => with_followup(&pension_answer(location), topic),
            SimulatedTopic::Labor => with_followup(&labor_answer(location), topic),
            SimulatedTopic::Facilitation => with_followup(FACILITATION_ANSWER, topic),
            // Nothing recognised: answer generally only when there is legal context
            SimulatedTopic::General if prompt.contains(CONTEXT_MARKER) => with_followup(GENERAL_ANSWER, topic),
            SimulatedTopic::General => FALLBACK_ANSWER.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for SimulatedRuntime {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn name(&self) -> String {
        "Simulated responder".to_string()
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        tokio::time::sleep(self.delay).await;
        let answer = self.respond(prompt);
        debug!("Simulated answer: {} chars", answer.len());
        Ok(answer)
    }
}

/// The user's question inside a full prompt, or the whole text for a bare one
fn question_focus(prompt: &str) -> &str {
    let start = prompt
        .rfind(QUESTION_MARKER)
        .map(|i| i + QUESTION_MARKER.len())
        .unwrap_or(0);
    let rest = &prompt[start..];
    match rest.find(ANSWER_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

fn location_hint(prompt: &str) -> Option<&'static str> {
    prompt
        .lines()
        .find(|line| line.starts_with(LOCATION_MARKER))
        .and_then(detect_location)
}

/// First matching topic in priority order; `General` when none matches
pub fn detect_topic(text: &str) -> SimulatedTopic {
    let lower = text.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if mentions(PENSION_WORDS) {
        SimulatedTopic::Pension
    } else if mentions(LABOR_WORDS) {
        SimulatedTopic::Labor
    } else if mentions(FACILITATION_WORDS) {
        SimulatedTopic::Facilitation
    } else {
        SimulatedTopic::General
    }
}

fn with_followup(answer: &str, topic: SimulatedTopic) -> String {
    let followup = match topic {
        SimulatedTopic::Pension => PENSION_FOLLOWUP,
        SimulatedTopic::Labor => LABOR_FOLLOWUP,
        SimulatedTopic::Facilitation => FACILITATION_FOLLOWUP,
        SimulatedTopic::General => GENERAL_FOLLOWUP,
    };
    format!("{}\n\n---\n\n{}", answer, followup)
}

fn pension_answer(location: Option<&str>) -> String {
    match location {
        Some(place) => format!(
            r#"Entiendo tu situación con la pensión alimentaria. Como sos de {place}, te explico exactamente dónde ir:

🏛️ **Juzgado de Familia de {place}**
📍 Ubicado en el Edificio de Tribunales de Justicia de {place}
📞 Teléfono: Poder Judicial centralizado 2295-3000 (pedir comunicar con pensiones alimentarias)
⏰ Horario: Lunes a viernes, 8:00 AM - 4:00 PM

🆓 **Defensa Pública (GRATUITA)**
📍 En el mismo edificio de tribunales
💡 Pueden llevarte el caso completo sin costo si calificas económicamente

👶 **PANI - Apoyo adicional (si es para menores)**
📍 Oficina local del PANI en {place}
🎯 Te pueden dar orientación legal gratuita y apoyo durante el proceso

📋 **Documentos que DEBES llevar:**
• ✅ Tu cédula de identidad
• ✅ Acta de nacimiento del menor (original y copia)
• ✅ Datos completos del padre/madre (nombre, cédula, dirección, trabajo)
• ✅ Comprobantes de gastos del menor (alimentación, educación, salud, ropa)
• ✅ Tu comprobante de ingresos (si trabajas)
• ✅ Cualquier resolución previa sobre pensión (si existe)

🚀 **Qué podés hacer ahí:**
• Presentar demanda de pensión alimentaria
• Solicitar aumento o rebajo de pensión existente
• Denunciar incumplimiento de pago
• Pedir retención salarial automática
• Solicitar apremio corporal si no paga

⚡ **IMPORTANTE:** Si hay incumplimiento, pueden retener salario, embargar bienes, e incluso ordenar prisión. ¡No esperes más!

💡 **Consejo:** Lleva todo organizado y pregunta por "medidas provisionales" si necesitas pensión urgente mientras se resuelve el caso."#
        ),
        None => PENSION_GENERAL_ANSWER.to_string(),
    }
}

fn labor_answer(location: Option<&str>) -> String {
    match location {
        Some(place) => format!(
            r#"Entiendo tu situación laboral. Como sos de {place}, te explico exactamente dónde ir:

📋 **PASO 1: Documenta TODO ahora mismo**
• Guarda correos, mensajes, horarios de trabajo
• Anota fechas exactas, horas y testigos
• Fotografía condiciones de trabajo si es necesario
• Conserva todos los recibos de pago

🏢 **Dirección Regional de Trabajo de {place}**
📍 Ministerio de Trabajo y Seguridad Social - Oficina {place}
📞 Línea gratuita: 800-TRABAJO (800-8722246)
⏰ Horario: Lunes a viernes, 7:00 AM - 4:00 PM
🆓 Servicios completamente GRATUITOS

🚨 **Para casos URGENTES (salarios no pagados):**
• Ve directamente a la oficina sin cita
• Solicita "mediación laboral inmediata"
• Pueden llamar a tu empleador ese mismo día
• Si no resuelve, pasan a inspección formal

⚖️ **Juzgado de Trabajo de {place}**
📍 Edificio de Tribunales de Justicia
🎯 Para demandas por despido injustificado
⚡ CRÍTICO: Solo tienes 30 días desde el despido

📄 **Documentos específicos que necesitas:**
• ✅ Tu cédula de identidad
• ✅ Contrato de trabajo (si lo tienes)
• ✅ Últimos 3 recibos de pago
• ✅ Carta de despido o última comunicación del empleador
• ✅ Todas las pruebas del problema (fotos, mensajes, testigos)

💡 **ESTRATEGIA:** Ve primero al Ministerio de Trabajo. Si no resuelven en 15 días, entonces al juzgado. ¡El tiempo corre en tu contra!"#
        ),
        None => LABOR_GENERAL_ANSWER.to_string(),
    }
}

const PENSION_GENERAL_ANSWER: &str = r#"Te entiendo perfectamente, la pensión alimentaria es un derecho fundamental de los menores. Te explico paso a paso:

🎯 **PASO 1: Evalúa tu situación**
• ¿El padre/madre reconoce al menor legalmente?
• ¿Hay acuerdo previo o necesitas demanda judicial?
• ¿Es urgente? (el menor no tiene lo básico)

🏛️ **PASO 2: Dónde ir según tu caso**

**Si hay urgencia extrema:**
• 🚨 Juzgado de Familia - Medidas Cautelares
• 📞 Solicita cita: Poder Judicial (centralizada)
• ⚡ Pueden fijar pensión provisional en días

**Para demanda formal:**
• 📍 Juzgado de Familia de tu circuito judicial
• 🆓 Defensa Pública (gratuita si calificas)
• 💼 Abogado privado (si prefieres)

📋 **PASO 3: Documentos que DEBES llevar**
• ✅ Acta de nacimiento del menor (original y copia)
• ✅ Tu cédula de identidad
• ✅ Cédula del otro progenitor (si la tienes)
• ✅ Comprobantes de gastos del menor:
  - Recibos médicos, medicinas
  - Facturas de alimentación
  - Gastos de educación, ropa
  - Recibo de guardería/cuidado

💰 **PASO 4: Cómo se calcula el monto**
• Ingresos del deudor alimentario
• Necesidades básicas del menor
• Número de hijos que debe mantener
• Capacidad económica de ambos padres

⏰ **PLAZOS IMPORTANTES:**
• No hay plazo para solicitar pensión
• Medidas provisionales: 1-2 semanas
• Proceso completo: 2-6 meses

🆘 **Si no paga la pensión:**
• Apremio corporal (puede ir preso)
• Embargo de salario/bienes
• Retención de licencia de conducir

💡 **CONSEJO:** Lleva todo organizado y no tengas miedo de preguntar en el juzgado. Es tu derecho y el del menor."#;

const LABOR_GENERAL_ANSWER: &str = r#"Entiendo tu situación laboral. Te guío paso a paso:

📋 **PASO 1: Documenta todo**
• Guarda correos, mensajes, horarios de trabajo
• Anota fechas, horas y testigos de incidentes
• Fotografía condiciones de trabajo si es necesario
• Conserva recibos de pago o comprobantes

🏢 **PASO 2: Dónde acudir según tu problema**

**Para salarios no pagados o atrasos:**
• 📞 Ministerio de Trabajo: 800-TRABAJO (800-8722246)
• 📍 Dirección Regional más cercana
• ⏰ Horario: 7:00 AM - 4:00 PM, lunes a viernes

**Para despidos injustificados:**
• 🏛️ Juzgado de Trabajo de tu zona
• 📄 Presenta demanda dentro de 30 días
• 💼 Considera contratar abogado laboralista

**Para acoso o discriminación:**
• 🚨 Inspección de Trabajo (denuncia inmediata)
• 📞 Línea gratuita: 800-TRABAJO
• 📧 También puedes denunciar en línea

📝 **PASO 3: Qué documentos necesitas**
• Cédula de identidad
• Contrato de trabajo (si lo tienes)
• Últimos 3 recibos de pago
• Certificación laboral o carta de despido
• Pruebas del problema específico

💡 **IMPORTANTE:** No esperes, muchos derechos laborales tienen plazos específicos para reclamar."#;

const FACILITATION_ANSWER: &str = r#"Excelente consulta sobre facilitación judicial:

📚 **Marco normativo:**
• La facilitación judicial está regulada por el Código Procesal Civil
• Requiere certificación del Consejo Superior de la Judicatura
• Es un mecanismo alternativo de resolución de conflictos

🎯 **Proceso típico:**
• Admisión de la solicitud
• Designación del facilitador
• Audiencias de facilitación
• Homologación del acuerdo (si se alcanza)

💡 **Ventajas:** Proceso más rápido, menos formal y con mayor control de las partes sobre el resultado."#;

const GENERAL_ANSWER: &str = r#"Basándome en la información disponible, te oriento paso a paso:

📋 **PASO 1: Identifica tu situación específica**
• ¿Es un problema civil, laboral, familiar o penal?
• ¿Qué resultado específico buscas obtener?
• ¿Hay urgencia en tu caso?

🏛️ **PASO 2: Instituciones según tu caso**

**Problemas Familiares (pensión, divorcio, custodia):**
📍 Juzgado de Familia de tu circuito
🆓 Defensa Pública disponible
📞 Poder Judicial: 2295-3000

**Problemas Laborales (salarios, despidos):**
📍 Ministerio de Trabajo: 800-TRABAJO (800-8722246)
📍 Juzgados de Trabajo para demandas

**Problemas Civiles (contratos, deudas):**
📍 Juzgados Civiles
💼 Considera abogado especializado

**Violencia o delitos:**
📍 Ministerio Público (Fiscalía)
🚨 OIJ para denuncias: 800-8000645

📄 **PASO 3: Documentos básicos siempre necesarios**
• ✅ Cédula de identidad
• ✅ Documentos relacionados al problema
• ✅ Pruebas (contratos, mensajes, testigos)
• ✅ Comprobantes de gastos si aplica

💡 **IMPORTANTE:** Si no estás seguro, ve primero a la Defensa Pública (gratuita) para orientación inicial. Están en todos los circuitos judiciales."#;

const FALLBACK_ANSWER: &str = r#"Lo siento, necesito más información específica para ayudarte mejor.

🤔 **Para brindarte una respuesta más precisa, podrías:**
• Especificar tu situación particular
• Indicar el tipo de procedimiento que te interesa
• Mencionar si es sobre familia, trabajo, civil, etc.

📚 **Puedo ayudarte con temas como:**
• Pensión alimentaria y derecho de familia
• Problemas laborales y derechos del trabajador
• Facilitación judicial y conciliación
• Procedimientos civiles básicos

¡Reformula tu pregunta con más detalles y te ayudo mejor! 😊"#;

const PENSION_FOLLOWUP: &str = r#"**¿En qué más puedo ayudarte?**
• ¿Necesitás que te explique más sobre alguno de estos pasos?
• ¿Querés saber qué hacer si el padre/madre vive en otro país?
• ¿Te gustaría conocer cuánto tiempo tarda cada etapa del proceso?
• ¿Tenés dudas sobre los costos o si hay manera de hacerlo gratis?

Estoy aquí para ayudarte con lo que necesites. ¡No dudes en preguntar! 😊"#;

const LABOR_FOLLOWUP: &str = r#"**¿Te puedo ayudar con algo más?**
• ¿Querés saber qué hacer si te despiden durante este proceso?
• ¿Necesitás información sobre indemnización o liquidación?
• ¿Te gustaría saber cómo presentar una denuncia formal?
• ¿Tenés preguntas sobre tus derechos específicos como trabajador?

Estoy aquí para lo que necesites. ¡Preguntá con confianza! 💪"#;

const FACILITATION_FOLLOWUP: &str = r#"**¿Algo más en lo que te pueda ayudar?**
• ¿Querés saber más sobre el proceso de capacitación?
• ¿Te interesa conocer las funciones específicas de un facilitador?
• ¿Necesitás información sobre dónde dar el curso?
• ¿Tenés dudas sobre los requisitos o documentos?

Estoy aquí para ayudarte. ¡Seguí preguntando! 📚"#;

const GENERAL_FOLLOWUP: &str = r#"**¿Necesitás más información?**
• ¿Querés que te aclare algún punto específico?
• ¿Te gustaría saber sobre los costos del procedimiento?
• ¿Necesitás orientación sobre los próximos pasos?
• ¿Tenés otra pregunta relacionada con tu situación?

Con gusto te ayudo con lo que necesites. ¡Preguntá sin pena! 😊"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_engine::ContextBuilder;

    #[test]
    fn test_pension_in_cartago_mentions_cartago() {
        let runtime = SimulatedRuntime::new(Duration::ZERO);
        let answer = tokio_test::block_on(runtime.generate("Necesito la pensión de mi hijo, vivo en Cartago")).unwrap();
        assert!(answer.contains("Cartago"));
        assert!(answer.contains("Juzgado de Familia de Cartago"));
        assert!(answer.contains("¿En qué más puedo ayudarte?"));
    }

    #[test]
    fn test_full_prompt_uses_question_section() {
        let prompt = ContextBuilder::default()
            .build("Mi jefe no me paga el salario, soy de Heredia", &[], &[])
            .prompt;
        let answer = SimulatedRuntime::default().respond(&prompt);
        assert!(answer.contains("Dirección Regional de Trabajo de Heredia"));
    }

    #[test]
    fn test_persona_text_does_not_pick_a_topic() {
        // The persona mentions "facilitador judicial"; only the question counts
        let prompt = ContextBuilder::default().build("Tengo una duda", &[], &[]).prompt;
        let answer = SimulatedRuntime::default().respond(&prompt);
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[test]
    fn test_topic_order() {
        assert_eq!(detect_topic("pensión por trabajo"), SimulatedTopic::Pension);
        assert_eq!(detect_topic("conflicto con mi empleador"), SimulatedTopic::Labor);
        assert_eq!(detect_topic("mediación vecinal"), SimulatedTopic::Facilitation);
        assert_eq!(detect_topic("otra cosa"), SimulatedTopic::General);
    }

    #[test]
    fn test_general_answer_when_context_present() {
        let prompt = format!("{}\n--- doc.txt ---\ntexto\n\n{} ¿Qué hago?\n\n{}", CONTEXT_MARKER, QUESTION_MARKER, ANSWER_MARKER);
        let answer = SimulatedRuntime::default().respond(&prompt);
        assert!(answer.starts_with("Basándome en la información disponible"));
        assert!(answer.contains("¿Necesitás más información?"));
    }

    #[tokio::test]
    async fn test_generate_reports_simulated_kind() {
        let runtime = SimulatedRuntime::new(Duration::from_millis(1));
        assert_eq!(runtime.kind(), BackendKind::Simulated);
        let answer = runtime.generate("conciliación").await.unwrap();
        assert!(answer.starts_with("Excelente consulta sobre facilitación judicial"));
    }
}
